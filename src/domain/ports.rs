// Port for reading monotonic time, so movement timing can be driven by tests.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary fixed origin. Never decreases.
    fn now_seconds(&self) -> f64;
}
