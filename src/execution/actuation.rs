// src/execution/actuation.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nalgebra::Vector3;
use tokio::sync::watch;

use crate::error::{ActuationError, ShotError};
use crate::models::pose::Pose;

/// 機体抽象化層の操作
///
/// 各呼び出しは完了まで待つ（blocking 指定に相当）。失敗は例外ではなく
/// `ActuationError` で返す。
#[async_trait]
pub trait Actuation: Send + Sync {
    async fn take_off(&self, height: f64) -> Result<(), ActuationError>;

    async fn land(&self) -> Result<(), ActuationError>;

    async fn go_to_waypoint(&self, waypoint: &Pose) -> Result<(), ActuationError>;

    async fn set_velocity(&self, velocity: &Vector3<f64>) -> Result<(), ActuationError>;
}

/// キャンセル要求の受信側
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
    // never() で作ったトークンの送信側を保持する
    _origin: Option<Arc<watch::Sender<bool>>>,
}

impl CancelToken {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx, _origin: None }
    }

    /// キャンセルされることのないトークン
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _origin: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// キャンセルされるまで待つ。送信側が先に破棄された場合は戻らない
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 上限時間とキャンセルで囲んだアクチュエーション呼び出し
#[derive(Clone)]
pub struct BoundedActuation {
    inner: Arc<dyn Actuation>,
    limit: Duration,
}

impl BoundedActuation {
    pub fn new(inner: Arc<dyn Actuation>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub async fn take_off(&self, height: f64, cancel: &mut CancelToken) -> Result<(), ShotError> {
        self.bounded("take_off", cancel, self.inner.take_off(height)).await
    }

    pub async fn land(&self, cancel: &mut CancelToken) -> Result<(), ShotError> {
        self.bounded("land", cancel, self.inner.land()).await
    }

    pub async fn go_to_waypoint(&self, waypoint: &Pose, cancel: &mut CancelToken) -> Result<(), ShotError> {
        self.bounded("go_to_waypoint", cancel, self.inner.go_to_waypoint(waypoint))
            .await
    }

    pub async fn set_velocity(&self, velocity: &Vector3<f64>) -> Result<(), ShotError> {
        match tokio::time::timeout(self.limit, self.inner.set_velocity(velocity)).await {
            Ok(result) => result.map_err(ShotError::from),
            Err(_) => Err(ShotError::Timeout("set_velocity")),
        }
    }

    async fn bounded<F>(
        &self,
        operation: &'static str,
        cancel: &mut CancelToken,
        call: F,
    ) -> Result<(), ShotError>
    where
        F: Future<Output = Result<(), ActuationError>>,
    {
        if cancel.is_cancelled() {
            return Err(ShotError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(ShotError::Cancelled),
            result = tokio::time::timeout(self.limit, call) => match result {
                Ok(result) => result.map_err(ShotError::from),
                Err(_) => Err(ShotError::Timeout(operation)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl Actuation for Stalled {
        async fn take_off(&self, _height: f64) -> Result<(), ActuationError> {
            std::future::pending().await
        }

        async fn land(&self) -> Result<(), ActuationError> {
            Err(ActuationError::Unavailable("land"))
        }

        async fn go_to_waypoint(&self, _waypoint: &Pose) -> Result<(), ActuationError> {
            std::future::pending().await
        }

        async fn set_velocity(&self, _velocity: &Vector3<f64>) -> Result<(), ActuationError> {
            Ok(())
        }
    }

    fn bounded() -> BoundedActuation {
        BoundedActuation::new(Arc::new(Stalled), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_times_out() {
        let mut cancel = CancelToken::never();

        let result = bounded().take_off(3.0, &mut cancel).await;

        assert_eq!(result, Err(ShotError::Timeout("take_off")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_call() {
        let (tx, rx) = watch::channel(false);
        let mut cancel = CancelToken::new(rx);
        let actuation = bounded();

        let call = tokio::spawn(async move {
            let pose = Pose {
                position: Vector3::zeros(),
                orientation: nalgebra::UnitQuaternion::identity(),
            };
            actuation.go_to_waypoint(&pose, &mut cancel).await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send_replace(true);

        assert_eq!(call.await.unwrap(), Err(ShotError::Cancelled));
    }

    #[tokio::test]
    async fn test_failure_is_passed_through() {
        let mut cancel = CancelToken::never();

        let result = bounded().land(&mut cancel).await;

        assert_eq!(result, Err(ShotError::Actuation(ActuationError::Unavailable("land"))));
    }
}
