//! Resilient reads of the sensor characteristic.
//!
//! Each attempt connects and reads under one hard timeout. Every attempt,
//! successful, failed or abandoned, is followed by an explicit disconnect
//! with its own bound, so no half-open connection leaks into the next attempt.

use crate::address::DeviceAddress;
use crate::device::ResolvedDevice;
use crate::radio::{Radio, RadioError, SENSOR_CHARACTERISTIC_UUID};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep, timeout};

/// Why a single attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Radio(#[from] RadioError),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

/// Error returned when no reading could be collected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    /// Discovery never found the device; no I/O was attempted
    #[error("device sn={serial_number} was not detected, can't collect metrics")]
    Unresolved { serial_number: u32 },
    /// Every attempt of the retry budget failed
    #[error("giving up after {attempts} attempts in {elapsed:?}: {last}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last: AttemptError,
    },
}

/// Reads raw sensor payloads under a [`RetryPolicy`].
pub struct Collector {
    radio: Arc<dyn Radio>,
    policy: RetryPolicy,
}

impl Collector {
    pub fn new(radio: Arc<dyn Radio>, policy: RetryPolicy) -> Self {
        Self { radio, policy }
    }

    /// Read the sensor characteristic of `device`.
    ///
    /// Returns the bytes of the first successful attempt.
    ///
    /// # Errors
    /// [`CollectError::Unresolved`] without touching the radio when the
    /// device has no address, [`CollectError::Exhausted`] with the last
    /// attempt's error once the retry budget is spent.
    pub async fn collect(&self, device: &ResolvedDevice) -> Result<Vec<u8>, CollectError> {
        let Some(address) = device.address else {
            return Err(CollectError::Unresolved {
                serial_number: device.identity.serial_number(),
            });
        };

        let started = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = timeout(self.policy.per_attempt_timeout, self.read_once(address)).await;
            // Bytes already read survive a slow or failing teardown.
            self.release(address).await;

            let error = match outcome {
                Ok(Ok(bytes)) => {
                    tracing::debug!(%address, attempt, "read sensor characteristic");
                    return Ok(bytes);
                }
                Ok(Err(err)) => AttemptError::Radio(err),
                Err(_) => AttemptError::Timeout(self.policy.per_attempt_timeout),
            };

            if attempt == max_attempts {
                return Err(CollectError::Exhausted {
                    attempts: attempt,
                    elapsed: started.elapsed(),
                    last: error,
                });
            }
            tracing::warn!(%address, attempt, max_attempts, error = %error, "read attempt failed");

            sleep(self.policy.delay_between_attempts).await;
            attempt += 1;
        }
    }

    async fn read_once(&self, address: DeviceAddress) -> Result<Vec<u8>, RadioError> {
        let mut connection = self.radio.connect(address).await?;
        connection
            .read_characteristic(SENSOR_CHARACTERISTIC_UUID)
            .await
    }

    /// Best-effort teardown after every attempt, bounded like an attempt.
    async fn release(&self, address: DeviceAddress) {
        match timeout(self.policy.per_attempt_timeout, self.radio.disconnect(address)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(%address, error = %err, "disconnect failed"),
            Err(_) => tracing::debug!(%address, "disconnect timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceIdentity;
    use crate::test_utils::{Attempt, FakeRadio, TEST_ADDRESS, sample_payload};
    use tokio_test::{assert_err, assert_ok};

    fn policy() -> RetryPolicy {
        RetryPolicy::new(12, Duration::from_secs(15), Duration::from_secs(5))
    }

    fn resolved() -> ResolvedDevice {
        ResolvedDevice::new(DeviceIdentity::new(2930012345, None), Some(TEST_ADDRESS))
    }

    fn collector(radio: &Arc<FakeRadio>, policy: RetryPolicy) -> Collector {
        Collector::new(radio.clone(), policy)
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_radio_uses_whole_budget() {
        let radio = Arc::new(FakeRadio::default());
        let collector = collector(&radio, policy());

        let err = assert_err!(collector.collect(&resolved()).await);
        match err {
            CollectError::Exhausted {
                attempts,
                elapsed,
                last,
            } => {
                assert_eq!(attempts, 12);
                assert_eq!(elapsed, Duration::from_secs(11 * 5));
                assert!(matches!(
                    last,
                    AttemptError::Radio(RadioError::Connection { .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let times = radio.connect_times(TEST_ADDRESS);
        assert_eq!(times.len(), 12);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let payload = sample_payload().to_vec();
        let radio = Arc::new(FakeRadio::default().script(
            TEST_ADDRESS,
            vec![
                Attempt::ConnectFails,
                Attempt::ReadFails,
                Attempt::Read(payload.clone()),
                Attempt::Read(vec![0xFF]),
            ],
        ));
        let collector = collector(&radio, policy());

        let bytes = assert_ok!(collector.collect(&resolved()).await);
        assert_eq!(bytes, payload);
        assert_eq!(radio.connect_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempt_is_torn_down_and_retried() {
        let payload = sample_payload().to_vec();
        let radio = Arc::new(
            FakeRadio::default()
                .script(TEST_ADDRESS, vec![Attempt::Hang, Attempt::Read(payload.clone())]),
        );
        let collector = collector(&radio, policy());

        let started = Instant::now();
        let bytes = assert_ok!(collector.collect(&resolved()).await);
        assert_eq!(bytes, payload);
        assert_eq!(started.elapsed(), Duration::from_secs(15 + 5));

        // One teardown for the abandoned attempt, one after the successful read.
        assert_eq!(radio.disconnects(), vec![TEST_ADDRESS, TEST_ADDRESS]);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_timeout_as_last_error() {
        let radio = Arc::new(
            FakeRadio::default().script(TEST_ADDRESS, vec![Attempt::Hang, Attempt::Hang]),
        );
        let collector = collector(
            &radio,
            RetryPolicy::new(2, Duration::from_secs(15), Duration::from_secs(5)),
        );

        let err = assert_err!(collector.collect(&resolved()).await);
        assert_eq!(
            err,
            CollectError::Exhausted {
                attempts: 2,
                elapsed: Duration::from_secs(15 + 5 + 15),
                last: AttemptError::Timeout(Duration::from_secs(15)),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_disconnect_keeps_successful_read() {
        let payload = sample_payload().to_vec();
        let radio = Arc::new(
            FakeRadio::default()
                .script(TEST_ADDRESS, vec![Attempt::Read(payload.clone())])
                .hanging_disconnect(),
        );
        let collector = collector(&radio, policy());

        let started = Instant::now();
        let bytes = assert_ok!(collector.collect(&resolved()).await);
        assert_eq!(bytes, payload);
        assert_eq!(radio.connect_count(), 1);
        // Only the teardown waited out its bound.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(radio.disconnects(), vec![TEST_ADDRESS]);
    }

    #[tokio::test]
    async fn unresolved_device_never_reaches_the_radio() {
        let radio = Arc::new(FakeRadio::default());
        let collector = collector(&radio, policy());
        let device = ResolvedDevice::new(DeviceIdentity::new(7, None), None);

        let err = assert_err!(collector.collect(&device).await);
        assert_eq!(err, CollectError::Unresolved { serial_number: 7 });
        assert_eq!(radio.connect_count(), 0);
        assert!(radio.disconnects().is_empty());
    }

    #[test]
    fn exhausted_message_includes_elapsed_time() {
        let err = CollectError::Exhausted {
            attempts: 12,
            elapsed: Duration::from_secs(235),
            last: AttemptError::Timeout(Duration::from_secs(15)),
        };
        assert_eq!(
            err.to_string(),
            "giving up after 12 attempts in 235s: attempt timed out after 15s"
        );
    }
}
