//! ## Design
//!
//! * the host drives an engine it doesn't look inside; an engine is anything
//!   that implements `engine::Engine`
//! * one frame = N engine steps, one timer tick, one full repaint; N comes
//!   from the speed multiplier (10 at 1x) and is read fresh every frame
//! * frames are scheduled one at a time: each frame asks for the next one,
//!   and the host keeps the handle so it can cancel it
//! * input arrives from the keyboard and from the on-screen keypad; both go
//!   through one lookup and one forwarding path
//! * ROMs come from a file or from a catalog; either way the loop stops, the
//!   engine resets, the ROM goes in, the loop starts again
//!
//! Model
//!
//! App (terminal front-end)
//!  |-- display, config, catalog
//!  |-- host(engine, frame pacer)
//!  |    |-- cadence controller(speed, scale)
//!  |    |-- keypad translation(keymap)
//!  |    `-- load sequencing(tickets)
//!  `-- event loop
//!       |-- apply finished fetches
//!       |-- release synthesised key holds
//!       |-- if a frame is due: host.run_frame(handle) -> present
//!       |-- take every input event already waiting
//!       `-- poll input until the next frame is due
pub mod app;
pub mod cadence;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod host;
pub mod keypad;
pub mod pacer;
pub mod render;
pub mod rom;
pub mod viewer;

#[cfg(test)]
mod testing;
