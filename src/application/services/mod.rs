pub mod delivery_cache;
pub mod dispatch_scheduler;
pub mod outbound;
pub mod stop_signal;
