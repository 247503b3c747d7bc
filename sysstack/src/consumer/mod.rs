//! Userspace consumer: drains `EVENTS`, symbolizes stacks, prints and exports

pub mod boot_clock;
pub mod event_display;
pub mod event_processor;
pub mod record_source;
pub mod stack_source;

pub use boot_clock::BootClock;
pub use event_display::{display_event, display_summary, format_event};
pub use event_processor::{ConsumerStats, EventProcessor, RenderedEvent};
pub use record_source::RecordSource;
pub use stack_source::StackSource;
