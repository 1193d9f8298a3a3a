//! Speech-driven facial animation for a morph-target avatar.
//!
//! Text is compiled into a viseme [`Timeline`](viseme::Timeline) (or built
//! from provider alignment), the orchestrator in [`speech`] keeps the shared
//! [`sync`] state in step with playback, and the [`animation`] driver blends
//! blink, mood and mouth channels onto the rig once per frame.

pub mod animation;
pub mod config;
pub mod speech;
pub mod sync;
pub mod util;
pub mod utterance;
pub mod viseme;
