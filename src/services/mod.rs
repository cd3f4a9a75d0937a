/// OpenAPI documentation generation.
pub mod documentation;
/// Typed broadcast helpers for session events.
pub mod events;
/// Health check service.
pub mod health_service;
/// Core session orchestration: guards, store mutations, broadcasts.
pub mod session_service;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Storage persistence supervision and degraded mode handling.
pub mod storage_supervisor;
