// src/models/state.rs

use tokio::sync::watch;

use crate::error::ShotError;

/// 外部フィードから更新される最新スナップショット
///
/// 書き込みは常にオブジェクト全体の置き換えで、読み出し側は更新途中の値を
/// 見ることがない。一度も受信していなければ `ShotError::NotReady`。
#[derive(Debug)]
pub struct StateFeed<T> {
    name: &'static str,
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> StateFeed<T> {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { name, tx }
    }

    /// 最新値を置き換える
    pub fn publish(&self, state: T) {
        self.tx.send_replace(Some(state));
    }

    /// 最新値のコピーを返す
    pub fn latest(&self) -> Result<T, ShotError> {
        self.tx.borrow().clone().ok_or(ShotError::NotReady(self.name))
    }
}
