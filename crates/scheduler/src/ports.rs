use async_trait::async_trait;

/// One periodic job the scheduler drives: inventory refresh (warms every
/// per-image cache, flushes scan-queue auto-enqueue) or version-check
/// refresh (enumerates distinct image references and populates the
/// version cache). Errors are swallowed and logged by the scheduler
/// itself so one bad tick never kills the loop, per §7's propagation
/// policy — implementations should not need their own retry logic.
#[async_trait]
pub trait RefreshTask: Send + Sync {
    async fn run(&self) -> Result<(), String>;

    /// Used only in tracing spans, to tell the two loops apart in logs.
    fn name(&self) -> &'static str;
}
