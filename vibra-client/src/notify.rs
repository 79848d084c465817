//! User notifications and navigation
//!
//! The generation flow reports progress through a [`Notifier`] and moves the
//! user around through a [`Navigator`]. Front ends supply their own; the CLI
//! uses the console implementations below.

use vibra_common::TaskStatus;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Task accepted by the backend
    Submitted { task_id: String },
    /// Tracks added to the library
    Completed { track_count: usize },
    /// Task finished without producing audio
    NoAudio,
    /// Upstream reported a failed task
    Failed { status: TaskStatus },
    /// Gave up after the attempt ceiling
    TimedOut,
    /// Gave up after repeated status errors
    ConnectionLost,
    /// Submission was rejected or never arrived
    SubmissionFailed { message: String },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Submitted { .. } => NoticeLevel::Info,
            Notice::Completed { .. } => NoticeLevel::Success,
            Notice::NoAudio
            | Notice::Failed { .. }
            | Notice::TimedOut
            | Notice::ConnectionLost
            | Notice::SubmissionFailed { .. } => NoticeLevel::Error,
        }
    }

    /// User-facing text
    pub fn message(&self) -> String {
        match self {
            Notice::Submitted { .. } => {
                "Geração iniciada! Isso pode levar alguns minutos.".to_string()
            }
            Notice::Completed { .. } => {
                "Música gerada com sucesso! Redirecionando para a Biblioteca...".to_string()
            }
            Notice::NoAudio => "Geração concluída mas sem dados de áudio.".to_string(),
            Notice::Failed { status } => {
                format!("Falha na geração: {}. Tente novamente.", status)
            }
            Notice::TimedOut => {
                "Tempo limite excedido. Verifique sua biblioteca mais tarde.".to_string()
            }
            Notice::ConnectionLost => "Erro de conexão persistente. A geração pode ter falhado. \
                                       Verifique sua biblioteca."
                .to_string(),
            Notice::SubmissionFailed { message } => {
                format!("Erro ao iniciar geração: {}", message)
            }
        }
    }

    /// Whether the notice should offer a shortcut to the library
    pub fn links_to_library(&self) -> bool {
        matches!(self, Notice::Completed { .. } | Notice::ConnectionLost)
    }
}

/// Client screens reachable by navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Explore,
    Library,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Explore => "/explore",
            Route::Library => "/library",
        }
    }
}

/// Receives user notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Moves the user to another screen
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Prints notices to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(?notice, "Notice");
        match notice.level() {
            NoticeLevel::Info => println!("ℹ {}", notice.message()),
            NoticeLevel::Success => println!("✓ {}", notice.message()),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message()),
        }
    }
}

/// Navigation is a no-op in a terminal beyond logging the destination
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = route.path(), "Navigate");
    }
}
