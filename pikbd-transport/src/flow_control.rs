//! Flow-control transport layer
//!
//! `FlowControlTransport` wraps a raw `Transport` (which only exchanges
//! individual reports) and adds query semantics: exchange serialization,
//! echo validation, typed parsing, and a retry policy for idempotent reads.
//!
//! ```text
//! [HidTransport]            ← implements Transport (raw I/O)
//!        |
//! [FlowControlTransport]    ← adds serialization, echo checks, retries
//!        |
//! [Keyboard session]
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::{validate_echo, Command, ParseError, Reply};
use crate::error::{ExchangeError, TransportError};
use crate::protocol::timing;
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// A transport wrapper that owns the command-response discipline
///
/// The firmware answers exactly one report per request, so concurrent
/// callers must not interleave their writes and reads. All exchanges go
/// through one async mutex; a disconnect poisons the wrapper and every
/// later call fails without touching the device.
pub struct FlowControlTransport {
    inner: Arc<dyn Transport>,
    /// Serializes command-response cycles. Without it, concurrent tasks
    /// interleave their writes and steal each other's replies.
    query_lock: tokio::sync::Mutex<()>,
    /// Set on disconnect; never cleared
    dead: AtomicBool,
}

impl FlowControlTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            query_lock: tokio::sync::Mutex::new(()),
            dead: AtomicBool::new(false),
        }
    }

    /// Access the wrapped raw transport.
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }

    pub fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    /// Whether a disconnect has permanently failed this wrapper
    pub fn is_poisoned(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    pub async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }

    /// Execute a typed command and parse its reply
    ///
    /// Holds the query lock for the whole cycle. Idempotent commands that
    /// time out are resent up to [`timing::READ_RETRIES`] times; a timeout
    /// on anything else becomes [`ExchangeError::Ambiguous`], because the
    /// device may have applied the write before the reply was lost.
    pub async fn execute<C, R>(&self, command: &C) -> Result<R, ExchangeError>
    where
        C: Command + Sync,
        R: Reply,
    {
        if self.dead.load(Ordering::SeqCst) {
            return Err(ExchangeError::Transport(TransportError::Disconnected));
        }
        let _guard = self.query_lock.lock().await;

        let wire = command.build();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.exchange(&wire).await {
                Ok(report) => {
                    validate_echo(C::ECHO, C::OPCODE, C::SUB, &report).map_err(|e| {
                        debug!("{}: {}", C::name(), e);
                        echo_error(e)
                    })?;
                    return Ok(R::parse(&report)?);
                }
                Err(TransportError::Timeout) => {
                    if C::IDEMPOTENT && attempt <= timing::READ_RETRIES {
                        debug!(
                            "{} timed out, resending ({}/{})",
                            C::name(),
                            attempt,
                            timing::READ_RETRIES
                        );
                        continue;
                    }
                    if C::IDEMPOTENT {
                        return Err(ExchangeError::Transport(TransportError::Timeout));
                    }
                    warn!("{} timed out after the write phase", C::name());
                    return Err(ExchangeError::Ambiguous { command: C::name() });
                }
                Err(e) => {
                    if matches!(e, TransportError::Disconnected) {
                        warn!("Device disconnected during {}", C::name());
                        self.dead.store(true, Ordering::SeqCst);
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

fn echo_error(e: ParseError) -> ExchangeError {
    match e {
        ParseError::CommandMismatch { expected, got } => {
            ExchangeError::UnexpectedResponse { expected, got }
        }
        other => ExchangeError::Parse(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Ack, GetUptime, SetHue, UptimeResponse};
    use crate::protocol::REPORT_SIZE;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
        exchanges: AtomicUsize,
        info: TransportDeviceInfo,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Vec<u8>, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                exchanges: AtomicUsize::new(0),
                info: TransportDeviceInfo {
                    vid: 0x2E8A,
                    pid: 0x0011,
                    device_path: "/dev/hidraw-test".into(),
                    serial: Some("vial:f64c2b3c".into()),
                    product_name: Some("Pi 500+ Keyboard - ISO".into()),
                },
            })
        }

        fn exchange_count(&self) -> usize {
            self.exchanges.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn exchange(&self, _request: &[u8]) -> Result<Vec<u8>, TransportError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::Timeout))
        }

        fn device_info(&self) -> &TransportDeviceInfo {
            &self.info
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn uptime_report(millis: u32) -> Vec<u8> {
        let mut report = vec![0u8; REPORT_SIZE];
        report[0] = 0x02;
        report[1] = 0x01;
        report[2..6].copy_from_slice(&millis.to_be_bytes());
        report
    }

    #[tokio::test]
    async fn test_idempotent_read_retries_after_timeout() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Ok(uptime_report(5000)),
        ]);
        let flow = FlowControlTransport::new(transport.clone());

        let resp: UptimeResponse = flow.execute(&GetUptime).await.unwrap();
        assert_eq!(resp.millis, 5000);
        assert_eq!(transport.exchange_count(), 2);
    }

    #[tokio::test]
    async fn test_idempotent_retries_are_bounded() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let flow = FlowControlTransport::new(transport.clone());

        let err = flow.execute::<_, UptimeResponse>(&GetUptime).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Transport(TransportError::Timeout)
        ));
        // initial attempt plus READ_RETRIES resends
        assert_eq!(transport.exchange_count(), 1 + timing::READ_RETRIES);
    }

    #[tokio::test]
    async fn test_write_timeout_is_ambiguous_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Timeout)]);
        let flow = FlowControlTransport::new(transport.clone());

        let err = flow.execute::<_, Ack>(&SetHue::new(42)).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Ambiguous { command: "SET_HUE" }));
        assert_eq!(transport.exchange_count(), 1);
    }

    #[tokio::test]
    async fn test_echo_mismatch_is_typed() {
        let mut wrong = vec![0u8; REPORT_SIZE];
        wrong[0] = 0xFC; // RPI_COMMAND echo where GET_KEYBOARD_VALUE was sent
        wrong[1] = 0x01;
        let transport = ScriptedTransport::new(vec![Ok(wrong)]);
        let flow = FlowControlTransport::new(transport);

        let err = flow.execute::<_, UptimeResponse>(&GetUptime).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::UnexpectedResponse {
                expected: 0x02,
                got: 0xFC
            }
        ));
    }

    #[tokio::test]
    async fn test_disconnect_poisons_without_further_io() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Disconnected)]);
        let flow = FlowControlTransport::new(transport.clone());

        let err = flow.execute::<_, UptimeResponse>(&GetUptime).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Transport(TransportError::Disconnected)
        ));
        assert!(flow.is_poisoned());
        assert_eq!(transport.exchange_count(), 1);

        // Poisoned wrapper fails fast, device untouched
        let err = flow.execute::<_, UptimeResponse>(&GetUptime).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Transport(TransportError::Disconnected)
        ));
        assert_eq!(transport.exchange_count(), 1);
    }
}
