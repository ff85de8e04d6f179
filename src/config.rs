//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WANDER__*` 覆盖（双下划线表示嵌套，如 `WANDER__LLM__PROVIDER=openai`）。
//! API 密钥不放在配置文件里，只从环境变量（可由 .env 提供）读取，见 [`Secrets`]。

use std::path::PathBuf;

use serde::Deserialize;

use crate::tools::{AMADEUS_BASE_URL, GOOGLE_CALENDAR_BASE_URL, TICKETMASTER_BASE_URL};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名、人设语气、个人偏好文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 人设描述，如 "The voice of Socrates, the Greek philosopher"
    pub persona: Option<String>,
    /// 是否用 LLM 按人设改写提示
    pub persona_enabled: bool,
    /// 个人偏好 JSON（「出行灵感」流程使用）
    pub profile_path: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            persona: None,
            persona_enabled: false,
            profile_path: None,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek；对应 API Key 缺失时退回 Mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次模型请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [agent] 段：循环步数上限、Schema 校验、每步无效输入上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    pub validate_schema: bool,
    pub max_input_attempts: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: crate::react::DEFAULT_MAX_STEPS,
            validate_schema: true,
            max_input_attempts: crate::conversation::DEFAULT_MAX_INPUT_ATTEMPTS,
        }
    }
}

/// [tools] 段：工具超时与各外部服务地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub ticketmaster: ServiceSection,
    pub amadeus: ServiceSection,
    pub calendar: CalendarSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            ticketmaster: ServiceSection::with_base_url(TICKETMASTER_BASE_URL),
            amadeus: ServiceSection::with_base_url(AMADEUS_BASE_URL),
            calendar: CalendarSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceSection {
    pub base_url: String,
}

impl ServiceSection {
    fn with_base_url(url: &str) -> Self {
        Self {
            base_url: url.to_string(),
        }
    }
}

/// [tools.calendar] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    pub base_url: String,
    pub calendar_id: String,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            base_url: GOOGLE_CALENDAR_BASE_URL.to_string(),
            calendar_id: "primary".to_string(),
        }
    }
}

/// 外部服务凭据（环境变量）
#[derive(Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub ticketmaster_api_key: Option<String>,
    pub amadeus_api_key: Option<String>,
    pub amadeus_api_secret: Option<String>,
    pub google_calendar_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("openai_api_key", &mark(&self.openai_api_key))
            .field("deepseek_api_key", &mark(&self.deepseek_api_key))
            .field("ticketmaster_api_key", &mark(&self.ticketmaster_api_key))
            .field("amadeus_api_key", &mark(&self.amadeus_api_key))
            .field("amadeus_api_secret", &mark(&self.amadeus_api_secret))
            .field("google_calendar_token", &mark(&self.google_calendar_token))
            .finish()
    }
}

impl Secrets {
    /// 从进程环境读取；空字符串视为未设置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            deepseek_api_key: get("DEEPSEEK_API_KEY"),
            ticketmaster_api_key: get("TICKETMASTER_API_KEY"),
            amadeus_api_key: get("AMADEUS_API_KEY"),
            amadeus_api_secret: get("AMADEUS_API_SECRET"),
            google_calendar_token: get("GOOGLE_CALENDAR_TOKEN"),
        }
    }
}

/// 从 config 目录加载配置，环境变量 WANDER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WANDER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WANDER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
