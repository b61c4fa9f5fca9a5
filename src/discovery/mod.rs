//! The eleven (plus two optional) discovery stage objects, run by the
//! orchestrator in the fixed order documented in `crate::orchestrator`.

pub mod all_cms;
pub mod cms;
pub mod cookies;
pub mod error_page;
pub mod headers;
pub mod interesting;
pub mod ip;
pub mod javascript;
pub mod more;
pub mod os;
pub mod platform;
pub mod queue;
pub mod server_header;
pub mod subdomains;
pub mod title;
pub mod tools;
pub mod urlless;
pub mod vulnerabilities;

pub use all_cms::AllCmsStage;
pub use cms::CmsStage;
pub use cookies::CookiesStage;
pub use error_page::ErrorPageStage;
pub use headers::HeadersStage;
pub use interesting::InterestingStage;
pub use ip::IpStage;
pub use javascript::JavaScriptStage;
pub use more::MoreStage;
pub use os::OsStage;
pub use platform::PlatformStage;
pub use subdomains::SubdomainsStage;
pub use title::TitleStage;
pub use tools::ToolsStage;
pub use urlless::UrlLessStage;
pub use vulnerabilities::VulnerabilitiesStage;
