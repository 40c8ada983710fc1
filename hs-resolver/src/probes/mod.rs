//! Source Probes
//!
//! One probe per source family. Every probe implements `SourceProbe` and
//! pushes `CandidateFact`s into the lookup's fact stream.
//!
//! | Probe           | Source              | Rank | Access                         |
//! |-----------------|---------------------|------|--------------------------------|
//! | primary_host    | GitHub              | 0    | direct                         |
//! | microblog       | Twitter / X         | 1    | syndication, then mirror race  |
//! | photo_platform  | Instagram           | 2    | viewer race                    |
//! | website         | discovered site     | -    | direct, accounts only          |

pub mod microblog;
pub mod photo_platform;
pub mod primary_host;
pub mod website;

pub use microblog::MicroblogProbe;
pub use photo_platform::PhotoPlatformProbe;
pub use primary_host::PrimaryHostProbe;
pub use website::WebsiteProbe;
