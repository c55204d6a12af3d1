//! # Boundary
//!
//! [`contracts::IngestBoundary`] implementations the watcher can talk to.
//!
//! | Client                 | Reaches                                   |
//! |------------------------|-------------------------------------------|
//! | [`HttpBoundary`]       | a remote API over `POST /datasets`, `/runs` |
//! | [`InProcessBoundary`]  | the run store and queue of this process    |
//! | [`RecordingBoundary`]  | nothing; records requests                  |

mod http;
mod in_process;
mod recording;

pub use http::{HttpBoundary, OP_CREATE_RUN, OP_REGISTER_DATASET};
pub use in_process::InProcessBoundary;
pub use recording::RecordingBoundary;
