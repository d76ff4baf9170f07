//! Session lifecycle and command multiplexing.
//!
//! A [`Session`] owns one connected duplex stream to a JVM in debug mode.
//! [`Session::open`] performs the ASCII handshake, negotiates ID sizes and
//! starts two tasks:
//!
//! ```text
//! Caller 1 ─┐                              ┌─► Writer Task ─► stream
//! Caller 2 ─┼─► execute() ─► pending table ┤
//! Caller N ─┘        ▲                     └─◄ Reader Task ◄─ stream
//!                    └── replies matched by packet id ──┘
//! ```
//!
//! The writer drains a FIFO queue of finished packets; the reader frames
//! incoming packets and completes the pending entry whose id matches.
//! A fault in either direction tears the whole session down: every
//! outstanding caller fails with the same error, stop observers fire, and
//! the state becomes [`SessionState::Closed`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::{JdwpError, Result};
use crate::event::{EventKind, EventModifier, SuspendPolicy};
use crate::protocol::{
    command_sets, event_request_commands, reference_type_commands, thread_reference_commands,
    vm_commands, CommandBuilder, IdSizes, PacketReader, HANDSHAKE, HEADER_SIZE, MAX_PACKET_SIZE,
};
use crate::types::{
    ClassInfo, ClassStatus, EventRequestID, MethodInfo, ReferenceTypeID, ThreadID, TypeTag,
    VersionInfo,
};

/// Lifecycle state of a session.
///
/// Transitions are monotone: `Created → Ready → Closed`. `Closed` is
/// terminal and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, handshake or ID-size negotiation still in progress.
    Created,
    /// Handshake complete, ID sizes known, reader loop running.
    Ready,
    /// Terminal: closed by the caller or torn down after a fault.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

type PendingSender = oneshot::Sender<Result<PacketReader>>;

/// State shared between the session handle and its reader/writer tasks.
struct Shared {
    state: watch::Sender<SessionState>,
    next_id: AtomicU32,
    id_sizes: Mutex<IdSizes>,
    pending: Mutex<HashMap<u32, PendingSender>>,
    outbound: mpsc::UnboundedSender<Bytes>,
    /// Stop observers; `None` once teardown has taken the snapshot.
    close_observers: Mutex<Option<Vec<oneshot::Sender<()>>>>,
    shutdown: CancellationToken,
}

/// A connected JDWP session.
///
/// All commands route through [`execute`](Self::execute)-style plumbing:
/// the packet is framed, queued for write and registered in the pending
/// table; the caller suspends until the matching reply arrives. Commands
/// from concurrent callers interleave freely on the wire.
///
/// # Example
///
/// ```ignore
/// use jdwp_client::{EventKind, EventModifier, Session, SuspendPolicy};
/// use tokio_util::sync::CancellationToken;
///
/// let stream = tokio::net::TcpStream::connect("127.0.0.1:5005").await?;
/// let cancel = CancellationToken::new();
/// let session = Session::open(stream, &cancel).await?;
///
/// let class = session
///     .get_class_by_signature("Ljava/lang/String;", &cancel)
///     .await?;
/// let methods = session.get_methods(class.type_id, &cancel).await?;
///
/// session.close().await;
/// ```
pub struct Session {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<SessionState>,
}

impl Session {
    /// Open a session on a connected duplex stream.
    ///
    /// Performs the 14-byte `JDWP-Handshake` exchange, issues
    /// `VirtualMachine.IDSizes` and returns once the session is
    /// [`SessionState::Ready`]. The stream is consumed; transport
    /// establishment (attach, port forwarding) is the caller's concern.
    ///
    /// # Errors
    ///
    /// - [`JdwpError::Protocol`] if the peer's handshake reply differs from
    ///   the expected bytes.
    /// - [`JdwpError::Transport`] if the stream fails during the exchange.
    /// - [`JdwpError::Cancelled`] if `cancel` fires first.
    pub async fn open<S>(stream: S, cancel: &CancellationToken) -> Result<Session>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut read_half, mut write_half) = tokio::io::split(stream);

        tokio::select! {
            res = handshake(&mut read_half, &mut write_half) => res?,
            _ = cancel.cancelled() => return Err(JdwpError::Cancelled),
        }
        tracing::debug!("JDWP handshake complete");

        let (state_tx, state_rx) = watch::channel(SessionState::Created);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: state_tx,
            next_id: AtomicU32::new(1),
            id_sizes: Mutex::new(IdSizes::new_unknown()),
            pending: Mutex::new(HashMap::new()),
            outbound: outbound_tx,
            close_observers: Mutex::new(Some(Vec::new())),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(writer_loop(
            write_half,
            outbound_rx,
            shared.shutdown.clone(),
        ));
        tokio::spawn(reader_loop(read_half, Arc::clone(&shared)));

        let session = Session { shared, state_rx };
        if let Err(e) = session.negotiate_id_sizes(cancel).await {
            session.shared.shutdown.cancel();
            return Err(e);
        }
        // A fault may already have closed the session; Closed is terminal
        // and must not be re-entered.
        session.shared.state.send_if_modified(|state| {
            if *state == SessionState::Created {
                *state = SessionState::Ready;
                true
            } else {
                false
            }
        });
        Ok(session)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Register a stop observer.
    ///
    /// The returned receiver resolves when the session closes, in
    /// registration order relative to other observers. Registering on an
    /// already-closed session resolves immediately.
    pub fn close_signal(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        match self.shared.close_observers.lock().as_mut() {
            Some(observers) => observers.push(tx),
            None => {
                let _ = tx.send(());
            }
        }
        rx
    }

    /// The negotiated ID sizes.
    pub fn id_sizes(&self) -> IdSizes {
        *self.shared.id_sizes.lock()
    }

    /// Close the session. Idempotent.
    ///
    /// Signals the reader and writer tasks, yields once so they can
    /// observe the signal, and waits for teardown to finish. Outstanding
    /// commands fail; stream-close errors are ignored.
    pub async fn close(&self) {
        if self.state() == SessionState::Closed {
            return;
        }
        self.shared.shutdown.cancel();
        tokio::task::yield_now().await;
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }

    /// Start a command packet with a freshly assigned id.
    fn command(&self, command_set: u8, command: u8) -> CommandBuilder {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        CommandBuilder::new(id, command_set, command, self.id_sizes())
    }

    /// Submit a finished command and await its reply.
    ///
    /// The reply reader is positioned at the payload (past the error
    /// code). A non-zero error code surfaces as
    /// [`JdwpError::CommandFailed`]; firing `cancel` fails only this
    /// caller and evicts its pending entry, so a late reply takes the
    /// unknown-id drop path.
    async fn execute(
        &self,
        id: u32,
        packet: Bytes,
        cancel: &CancellationToken,
    ) -> Result<PacketReader> {
        if self.state() == SessionState::Closed {
            return Err(closed_error());
        }

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id, tx);

        if self.shared.outbound.send(packet).is_err() {
            self.shared.pending.lock().remove(&id);
            return Err(closed_error());
        }

        tokio::select! {
            // Biased so that a token firing together with a reply still
            // surfaces as cancellation.
            biased;
            _ = cancel.cancelled() => {
                self.shared.pending.lock().remove(&id);
                Err(JdwpError::Cancelled)
            }
            outcome = rx => match outcome {
                Ok(result) => result,
                // Sender dropped without completing; only possible when the
                // session died between insert and teardown snapshot.
                Err(_) => Err(closed_error()),
            },
        }
    }

    /// Issue `VirtualMachine.IDSizes` and record the five widths.
    async fn negotiate_id_sizes(&self, cancel: &CancellationToken) -> Result<()> {
        let builder = self.command(command_sets::VIRTUAL_MACHINE, vm_commands::ID_SIZES);
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;

        let field = reply.read_i32()?;
        let method = reply.read_i32()?;
        let object = reply.read_i32()?;
        let reference_type = reply.read_i32()?;
        let frame = reply.read_i32()?;
        *self.shared.id_sizes.lock() = IdSizes::new(field, method, object, reference_type, frame);
        tracing::debug!(
            field,
            method,
            object,
            reference_type,
            frame,
            "negotiated ID sizes"
        );
        Ok(())
    }

    /// `VirtualMachine.Version`: description and version numbers of the
    /// target VM.
    pub async fn get_version(&self, cancel: &CancellationToken) -> Result<VersionInfo> {
        let builder = self.command(command_sets::VIRTUAL_MACHINE, vm_commands::VERSION);
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;

        Ok(VersionInfo {
            description: reply.read_string()?,
            jdwp_major: reply.read_i32()?,
            jdwp_minor: reply.read_i32()?,
            vm_version: reply.read_string()?,
            vm_name: reply.read_string()?,
        })
    }

    /// `VirtualMachine.ClassesBySignature`: every loaded class matching
    /// the JNI signature.
    pub async fn get_classes_by_signature(
        &self,
        signature: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ClassInfo>> {
        let mut builder = self.command(
            command_sets::VIRTUAL_MACHINE,
            vm_commands::CLASSES_BY_SIGNATURE,
        );
        builder.put_string(signature);
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;

        let count = reply.read_i32()?;
        let mut classes = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let type_tag = TypeTag::try_from(reply.read_u8()?)?;
            let type_id = reply.read_reference_type_id()?;
            let status = ClassStatus::from_wire(reply.read_i32()?);
            classes.push(ClassInfo {
                type_tag,
                type_id,
                status,
            });
        }
        Ok(classes)
    }

    /// Like [`get_classes_by_signature`](Self::get_classes_by_signature),
    /// but requires exactly one candidate.
    ///
    /// # Errors
    ///
    /// [`JdwpError::InvalidArgument`] when the signature matches zero
    /// classes ("not found") or several ("is ambiguous").
    pub async fn get_class_by_signature(
        &self,
        signature: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassInfo> {
        let mut classes = self.get_classes_by_signature(signature, cancel).await?;
        match classes.len() {
            0 => Err(JdwpError::InvalidArgument(format!(
                "Class not found: {signature}"
            ))),
            1 => Ok(classes.remove(0)),
            _ => Err(JdwpError::InvalidArgument(format!(
                "Class signature is ambiguous: {signature}"
            ))),
        }
    }

    /// `ReferenceType.Methods`: the methods declared by a reference type.
    pub async fn get_methods(
        &self,
        reference_type: ReferenceTypeID,
        cancel: &CancellationToken,
    ) -> Result<Vec<MethodInfo>> {
        let mut builder = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::METHODS,
        );
        builder.put_reference_type_id(reference_type);
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;

        let count = reply.read_i32()?;
        let mut methods = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            methods.push(MethodInfo {
                method_id: reply.read_method_id()?,
                name: reply.read_string()?,
                signature: reply.read_string()?,
                mod_bits: reply.read_i32()?,
            });
        }
        Ok(methods)
    }

    /// `EventRequest.Set`: install an event request with the given suspend
    /// policy and modifiers. Returns the request id for
    /// [`clear_event_request`](Self::clear_event_request).
    pub async fn set_event_request(
        &self,
        kind: EventKind,
        suspend_policy: SuspendPolicy,
        modifiers: &[EventModifier],
        cancel: &CancellationToken,
    ) -> Result<EventRequestID> {
        let mut builder = self.command(command_sets::EVENT_REQUEST, event_request_commands::SET);
        builder
            .put_u8(kind.as_u8())
            .put_u8(suspend_policy.as_u8())
            .put_i32(modifiers.len() as i32);
        for modifier in modifiers {
            modifier.serialize(&mut builder);
        }
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;
        Ok(EventRequestID::new(reply.read_i32()?))
    }

    /// `EventRequest.Clear`: remove one event request.
    pub async fn clear_event_request(
        &self,
        kind: EventKind,
        request: EventRequestID,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut builder = self.command(command_sets::EVENT_REQUEST, event_request_commands::CLEAR);
        builder.put_u8(kind.as_u8()).put_i32(request.raw());
        let id = builder.id();
        self.execute(id, builder.finish(), cancel).await?;
        Ok(())
    }

    /// `EventRequest.ClearAllBreakpoints`: remove every breakpoint request.
    pub async fn clear_all_breakpoints(&self, cancel: &CancellationToken) -> Result<()> {
        let builder = self.command(
            command_sets::EVENT_REQUEST,
            event_request_commands::CLEAR_ALL_BREAKPOINTS,
        );
        let id = builder.id();
        self.execute(id, builder.finish(), cancel).await?;
        Ok(())
    }

    /// `VirtualMachine.Suspend`: suspend every thread in the target VM.
    pub async fn suspend_all(&self, cancel: &CancellationToken) -> Result<()> {
        let builder = self.command(command_sets::VIRTUAL_MACHINE, vm_commands::SUSPEND);
        let id = builder.id();
        self.execute(id, builder.finish(), cancel).await?;
        Ok(())
    }

    /// `VirtualMachine.Resume`: resume every thread suspended through JDWP.
    pub async fn resume_all(&self, cancel: &CancellationToken) -> Result<()> {
        let builder = self.command(command_sets::VIRTUAL_MACHINE, vm_commands::RESUME);
        let id = builder.id();
        self.execute(id, builder.finish(), cancel).await?;
        Ok(())
    }

    /// `ThreadReference.Name`: the name of a thread.
    pub async fn get_thread_name(
        &self,
        thread: ThreadID,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut builder = self.command(
            command_sets::THREAD_REFERENCE,
            thread_reference_commands::NAME,
        );
        builder.put_thread_id(thread);
        let id = builder.id();
        let mut reply = self.execute(id, builder.finish(), cancel).await?;
        reply.read_string()
    }
}

fn closed_error() -> JdwpError {
    JdwpError::InvalidOperation("connection is closed".to_string())
}

/// Write the 14 handshake bytes and require the identical bytes back.
async fn handshake<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(HANDSHAKE).await?;
    writer.flush().await?;

    let mut reply = [0u8; HANDSHAKE.len()];
    reader.read_exact(&mut reply).await?;
    if reply != HANDSHAKE {
        return Err(JdwpError::Protocol("Unexpected handshake reply".to_string()));
    }
    Ok(())
}

/// Drain the outbound queue onto the stream, in FIFO order.
///
/// A write failure just stops the drain: the reader loop observes the
/// corresponding stream failure and runs the teardown.
async fn writer_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    shutdown: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let packet = tokio::select! {
            _ = shutdown.cancelled() => return,
            maybe = outbound.recv() => match maybe {
                Some(packet) => packet,
                None => return,
            },
        };

        if let Err(e) = write_packet(&mut writer, &packet).await {
            tracing::debug!("write failed: {e}");
            return;
        }
    }
}

async fn write_packet<W>(writer: &mut W, packet: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(packet).await?;
    writer.flush().await
}

/// Frame incoming packets and complete matching pending replies.
///
/// Runs until a fault (stream error, malformed packet) or the session's
/// shutdown signal, then tears the session down.
async fn reader_loop<R>(mut reader: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let error = loop {
        match read_packet(&mut reader, &shared.shutdown).await {
            Ok(packet) => {
                if let Err(e) = dispatch_reply(&shared, packet) {
                    break e;
                }
            }
            Err(e) => break e,
        }
    };
    teardown(&shared, error);
}

/// Read one complete packet (header + payload), enforcing length bounds.
async fn read_packet<R>(reader: &mut R, shutdown: &CancellationToken) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    tokio::select! {
        _ = shutdown.cancelled() => return Err(closed_error()),
        res = reader.read_exact(&mut header) => { res?; }
    }

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if length < HEADER_SIZE as u32 {
        return Err(JdwpError::Protocol(format!("JDWP packet too small: {length}")));
    }
    if length > MAX_PACKET_SIZE {
        return Err(JdwpError::Protocol(format!("JDWP packet too large: {length}")));
    }

    let mut packet = vec![0u8; length as usize];
    packet[..HEADER_SIZE].copy_from_slice(&header);
    if length as usize > HEADER_SIZE {
        tokio::select! {
            _ = shutdown.cancelled() => return Err(closed_error()),
            res = reader.read_exact(&mut packet[HEADER_SIZE..]) => { res?; }
        }
    }
    Ok(Bytes::from(packet))
}

/// Match a received packet against the pending table by id.
///
/// Unknown ids are dropped silently: either the VM sent an unsolicited
/// packet (an event) or the caller cancelled and its entry was evicted.
fn dispatch_reply(shared: &Shared, packet: Bytes) -> Result<()> {
    let id_sizes = *shared.id_sizes.lock();
    let mut reply = PacketReader::new(packet, id_sizes);
    reply.skip(4)?; // length, already validated
    let id = reply.read_u32()?;
    reply.skip(1)?; // flags; demux is by id only
    let error_code = reply.read_u16()?;

    let Some(sender) = shared.pending.lock().remove(&id) else {
        tracing::debug!(id, "dropping packet with no pending command");
        return Ok(());
    };

    let outcome = if error_code == 0 {
        Ok(reply)
    } else {
        Err(JdwpError::CommandFailed(error_code))
    };
    // The caller may have been cancelled between eviction check and here;
    // a dead receiver is fine.
    let _ = sender.send(outcome);
    Ok(())
}

/// Terminal teardown: close the state machine, fail every outstanding
/// caller with the fault, then fire stop observers in registration order.
fn teardown(shared: &Shared, error: JdwpError) {
    tracing::debug!("session teardown: {error}");
    let _ = shared.state.send(SessionState::Closed);

    let pending: Vec<PendingSender> = {
        let mut table = shared.pending.lock();
        table.drain().map(|(_, sender)| sender).collect()
    };
    for sender in pending {
        let _ = sender.send(Err(error.clone()));
    }

    let observers = shared.close_observers.lock().take().unwrap_or_default();
    for observer in observers {
        let _ = observer.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Created.to_string(), "created");
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_closed_error_message() {
        assert!(closed_error().to_string().contains("connection is closed"));
    }
}
