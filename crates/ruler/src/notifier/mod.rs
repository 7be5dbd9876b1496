mod channel;
mod dispatcher;
mod log;
mod retry;
mod webhook;

pub use channel::{ChannelNotifier, Notifier, NotifyError};
pub use dispatcher::{channel, Dispatcher, EventSink};
pub use log::LogNotifier;
pub use retry::RetryNotifier;
pub use webhook::WebhookNotifier;
