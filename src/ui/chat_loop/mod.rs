mod controller;
mod event_loop;
mod keybindings;
mod lifecycle;

pub use event_loop::run_chat;
