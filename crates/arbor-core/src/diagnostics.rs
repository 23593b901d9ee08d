//! Diagnostic messages emitted by solvers, and the sinks that receive them.
//!
//! Solvers are handed a [`DiagnosticSink`] at initialization. The default
//! [`TracingSink`] forwards everything to `tracing`.

use std::fmt;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Configuration problem that does not stop the solver.
    Warn,
    /// Informational detail about solver setup.
    Debug,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A non-fatal message produced while setting up or running a solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A pole is attached to a bone that is not the tip of its chain.
    MisplacedPole { bone: usize, name: String },
    /// Emitted once after one or more [`Diagnostic::MisplacedPole`].
    MisplacedPoleSummary { count: usize },
    /// An effector sits on a bone that is not a leaf of the solved
    /// subtree and will not be solved for.
    IgnoredEffector { bone: usize, name: String },
    /// Solver initialization finished.
    Initialized { effectors: usize, chains: usize },
    /// Solver state was released.
    Released { effectors: usize },
}

impl Diagnostic {
    /// Severity of this diagnostic.
    pub const fn level(&self) -> Level {
        match self {
            Self::MisplacedPole { .. } | Self::MisplacedPoleSummary { .. } => Level::Warn,
            Self::IgnoredEffector { .. } | Self::Initialized { .. } | Self::Released { .. } => {
                Level::Debug
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MisplacedPole { bone, name } => write!(
                f,
                "FABRIK: Pole attached to bone {bone} ({name}) has no effect and will be ignored."
            ),
            Self::MisplacedPoleSummary { count } => write!(
                f,
                "FABRIK: {count} pole(s) ignored. Poles only make sense when attached to the end \
                 of chains, such as effector bones, or bones with multiple children."
            ),
            Self::IgnoredEffector { bone, name } => write!(
                f,
                "FABRIK: Effector on bone {bone} ({name}) is not at the end of a chain and will be ignored."
            ),
            Self::Initialized { effectors, chains } => write!(
                f,
                "FABRIK: Initialized with {effectors} end-effectors. {chains} chains were created."
            ),
            Self::Released { effectors } => {
                write!(f, "FABRIK: Released solver state for {effectors} end-effectors.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DiagnosticSink
// ---------------------------------------------------------------------------

/// Receiver for solver diagnostics. Fire-and-forget.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one diagnostic.
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic.level() {
            Level::Warn => tracing::warn!("{diagnostic}"),
            Level::Debug => tracing::debug!("{diagnostic}"),
        }
    }
}

/// Discards every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: &Diagnostic) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
