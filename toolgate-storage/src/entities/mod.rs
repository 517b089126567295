//! sea-orm entity definitions

pub mod call_logs;
pub mod service_groups;
pub mod services;
pub mod tool_cache;

pub use call_logs::{
    ActiveModel as CallLogActiveModel, Entity as CallLogs, Model as CallLog,
};
pub use service_groups::{
    ActiveModel as GroupActiveModel, Entity as ServiceGroups, Model as GroupRow,
};
pub use services::{ActiveModel as ServiceActiveModel, Entity as Services, Model as ServiceRow};
pub use tool_cache::{
    ActiveModel as ToolCacheActiveModel, Entity as ToolCacheEntries, Model as ToolCacheRow,
};
