// SPDX-License-Identifier: BUSL-1.1

//! Core, transport-agnostic logic for the Edge Gateway: the priority lane
//! buffer, conversation key resolution and routing store, session state
//! machine, delivery tracking, circuit breaking, and composite
//! snapshot/restore.
//!
//! Everything in this crate is pure or synchronously locked; it has no
//! knowledge of WebSocket, HTTP, or any particular async runtime beyond the
//! [`clock`] and [`tokio_util::sync::CancellationToken`] abstractions needed
//! to stay testable under a fake clock.

pub mod b64_bytes;
pub mod circuit;
pub mod clock;
pub mod conv_key;
pub mod conv_store;
pub mod delivery;
pub mod error;
pub mod fifo;
pub mod lane_buffer;
pub mod message;
pub mod session;
pub mod snapshot;
pub mod subscription;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitPhase};
pub use clock::{system_clock, Clock, EpochMs, FakeClock, SharedClock, SystemClock};
pub use conv_key::{resolve as resolve_conversation_key, ConversationKey, ResolveInput, Resolution};
pub use conv_store::{ConversationBinding, ConversationStore, ConversationStoreConfig};
pub use delivery::{DeliveryTracker, PendingMessage};
pub use error::{GatewayError, Result};
pub use fifo::BoundedFifo;
pub use lane_buffer::LaneBuffer;
pub use message::{ConversationScope, Lane, LaneMessage, MessageType, RoutingContext};
pub use session::{Session, SessionEvent, SessionManager, SessionManagerConfig, SessionState};
pub use snapshot::GatewaySnapshot;
pub use subscription::{Disposer, HandlerSet};
