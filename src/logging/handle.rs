use tracing_appender::non_blocking::WorkerGuard;

/// Хэндл инициализированного логирования.
///
/// Держит guard файлового приёмника: пока хэндл жив, фоновый поток
/// `tracing-appender` пишет в файл; при уничтожении буфер сбрасывается.
#[must_use = "dropping the handle flushes and stops the file sink"]
pub struct LoggingHandle {
    _file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            _file_guard: file_guard,
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self._file_guard.is_some()
    }

    /// Сбрасывает буферы и останавливает файловый приёмник.
    pub fn shutdown(mut self) {
        tracing::debug!(file_sink = self.has_file_sink(), "logging shutdown");
        drop(self._file_guard.take());
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .finish()
    }
}
