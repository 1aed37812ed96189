use std::fmt::Debug;
use std::io;
use std::num::NonZero;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockPlatform;
#[cfg(test)]
use crate::pal::fallback::BuildTargetPlatform as FallbackPlatform;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, LargePageMapping, Platform};

/// Enum to hide the different platform implementations behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fallback(&'static FallbackPlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn fallback() -> Self {
        Self::Fallback(&crate::pal::fallback::BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn large_page_size(&self) -> Option<NonZero<usize>> {
        match self {
            Self::Target(p) => p.large_page_size(),
            #[cfg(test)]
            Self::Fallback(p) => p.large_page_size(),
            #[cfg(test)]
            Self::Mock(p) => p.large_page_size(),
        }
    }

    fn map_large_pages(&self, len_bytes: usize) -> io::Result<LargePageMapping> {
        match self {
            Self::Target(p) => p.map_large_pages(len_bytes),
            #[cfg(test)]
            Self::Fallback(p) => p.map_large_pages(len_bytes),
            #[cfg(test)]
            Self::Mock(p) => p.map_large_pages(len_bytes),
        }
    }

    fn unmap_large_pages(&self, mapping: LargePageMapping) {
        match self {
            Self::Target(p) => p.unmap_large_pages(mapping),
            #[cfg(test)]
            Self::Fallback(p) => p.unmap_large_pages(mapping),
            #[cfg(test)]
            Self::Mock(p) => p.unmap_large_pages(mapping),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(p) => p.fmt(f),
            #[cfg(test)]
            Self::Fallback(p) => p.fmt(f),
            #[cfg(test)]
            Self::Mock(p) => p.fmt(f),
        }
    }
}
