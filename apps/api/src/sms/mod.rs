// Review-request SMS workflow and its outbound adapters.
// Handlers stay thin; the pipeline owns ordering and status transitions.

pub mod gateway;
pub mod handlers;
pub mod pipeline;
pub mod shortener;
pub mod template;
pub mod validation;
