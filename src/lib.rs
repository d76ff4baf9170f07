//! # jdwp-client
//!
//! Async client for the Java Debug Wire Protocol (JDWP).
//!
//! Connects to a JVM running in debug mode over any byte-duplex stream the
//! caller supplies, and exposes a typed command surface for enumerating
//! loaded classes, inspecting methods and installing event requests
//! (breakpoints, single-step, class-prepare, ...).
//!
//! ## Architecture
//!
//! - **Protocol layer** ([`protocol`]): the 11-byte packet framing,
//!   per-connection ID-width negotiation, and the big-endian
//!   encoder/decoder pair ([`protocol::CommandBuilder`],
//!   [`protocol::PacketReader`]).
//! - **Session layer** ([`session`]): handshake, a dedicated reader task
//!   that demultiplexes replies to concurrent callers by packet id, and a
//!   dedicated writer task draining a FIFO queue.
//!
//! ## Example
//!
//! ```ignore
//! use jdwp_client::{EventKind, EventModifier, Session, SuspendPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> jdwp_client::Result<()> {
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:5005").await?;
//!     let cancel = CancellationToken::new();
//!     let session = Session::open(stream, &cancel).await?;
//!
//!     let class = session
//!         .get_class_by_signature("Lcom/example/Main;", &cancel)
//!         .await?;
//!     session
//!         .set_event_request(
//!             EventKind::ClassPrepare,
//!             SuspendPolicy::EventThread,
//!             &[EventModifier::ClassMatch("com.example.*".into())],
//!             &cancel,
//!         )
//!         .await?;
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod types;

pub use error::{JdwpError, Result};
pub use event::{EventKind, EventModifier, StepDepth, StepSize, SuspendPolicy};
pub use session::{Session, SessionState};
pub use types::{
    ClassInfo, ClassStatus, EventRequestID, FieldID, FrameID, MethodID, MethodInfo, ObjectID,
    ReferenceTypeID, ThreadID, TypeTag, VersionInfo,
};
