/// Conversion of updates into session events
pub mod handlers;
/// Dispatcher wiring and startup
pub mod runner;
/// Telegram channel implementation
pub mod telegram;
/// Texts and keyboards
pub mod views;

pub use runner::run_bot;
pub use telegram::TelegramChannel;
