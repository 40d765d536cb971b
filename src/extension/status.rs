//! Skip flags returned by extensions.

use bitflags::bitflags;

use super::ExtensionStage;

bitflags! {
    /// Signals returned by extensions telling the resolver which remaining work to skip.
    ///
    /// Statuses of successive extensions are combined with `|`, so within one
    /// resolution call a flag, once set, stays set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExtensionStatus: u8 {
        /// Skip the remaining before-resolve extensions.
        const SKIP_EXTENSIONS_BEFORE_RESOLVE = 1 << 0;
        /// Skip driver dispatch.
        const SKIP_RESOLVE = 1 << 1;
        /// Skip the remaining after-resolve extensions.
        const SKIP_EXTENSIONS_AFTER_RESOLVE = 1 << 2;
    }
}

impl ExtensionStatus {
    /// Continue with everything.
    pub const DEFAULT: Self = Self::empty();

    pub fn skip_resolve(self) -> bool {
        self.contains(Self::SKIP_RESOLVE)
    }

    /// Whether the remaining extensions of `stage` should be skipped
    pub fn skip(self, stage: ExtensionStage) -> bool {
        match stage {
            ExtensionStage::BeforeResolve => self.contains(Self::SKIP_EXTENSIONS_BEFORE_RESOLVE),
            ExtensionStage::AfterResolve => self.contains(Self::SKIP_EXTENSIONS_AFTER_RESOLVE),
        }
    }
}
