//! Отмена операций каталога.
//!
//! `CancelHandle` принадлежит вызывающему (например, обработчику Ctrl-C),
//! `Cancellation` передаётся в каждую операцию каталога. Обращение к
//! хранилищу гоняется против отмены через `tokio::select!`; при срабатывании
//! незавершённая future просто отбрасывается.

use std::future::{pending, Future};
use std::time::Duration;

use aclsync_error::{CancelReason, DirectoryError, Operation};
use tokio::sync::watch;
use tokio::time::Instant;

/// Сторона, которая может отменить операции.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Сигнал отмены и необязательный дедлайн для одной или нескольких операций.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Отменяет все операции, получившие `Cancellation` от этого хэндла.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Новый `Cancellation`, связанный с этим хэндлом.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: Some(self.tx.subscribe()),
            deadline: None,
        }
    }
}

impl Cancellation {
    /// Операция, которую нельзя отменить и у которой нет дедлайна.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(
        mut self,
        deadline: Instant,
    ) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Дедлайн через `timeout` от текущего момента.
    pub fn with_timeout(
        self,
        timeout: Duration,
    ) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Синхронная проверка: уже отменено или дедлайн истёк.
    pub fn check(&self) -> Option<CancelReason> {
        if self.rx.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Завершается, когда операция отменена или истёк дедлайн.
    ///
    /// Если ни сигнала, ни дедлайна нет, никогда не завершается. Явная
    /// отмена имеет приоритет над дедлайном.
    pub async fn cancelled(&self) -> CancelReason {
        let signal = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                    if !fired {
                        // Хэндл уничтожен без отмены.
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = signal => CancelReason::Cancelled,
            _ = deadline => CancelReason::DeadlineExceeded,
        }
    }

    /// Выполняет `fut`, если операцию не отменят раньше.
    ///
    /// Ветка отмены опрашивается первой, поэтому уже отменённая операция не
    /// начинает обращение к хранилищу.
    pub async fn run<F, T>(
        &self,
        operation: Operation,
        fut: F,
    ) -> Result<T, DirectoryError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            reason = self.cancelled() => {
                tracing::debug!(%operation, %reason, "operation interrupted");
                Err(DirectoryError::Cancelled { operation, reason })
            }
            out = fut => Ok(out),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
