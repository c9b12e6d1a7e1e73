//! Query state machine shared by every front end.
//!
//! A [`RequestController`] takes raw ticker text, asks the configured
//! [`PredictionSource`](prediction_core::PredictionSource) for a forecast and
//! publishes the resulting [`RequestState`] on a watch channel.

pub mod controller;
pub mod state;

pub use controller::{RequestController, SubmitOutcome, GENERIC_FAILURE_MESSAGE};
pub use state::RequestState;
