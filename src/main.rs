//! Wander - 对话式旅行规划助手
//!
//! 入口：加载 .env 与配置、初始化日志、组装 TravelAgent，运行菜单循环。
//! 每个菜单操作是一次会话：出错时报告并回到菜单，只有 quit（或输入结束）退出。

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wander::config::{load_config, AppConfig, Secrets};
use wander::conversation::travel::ITINERARY;
use wander::conversation::{InputSource, PersonaVoice, SharedState, StdinInput};
use wander::core::{ConversationError, SessionSupervisor};
use wander::TravelAgent;

const WELCOME: &str = "Welcome to the Travel Planner! Please follow the prompts to plan your itinerary.";
const MENU: &str = "Choose a starting point (activities, destination, dates), type 'ideas' to start from suggested prompts, or type 'quit' to exit: ";
const GOODBYE: &str = "Exiting Travel Planner. Thank you for using our service!";
const INVALID_OPTION: &str =
    "Invalid option. Please choose a valid starting point, type 'ideas' for suggested prompts, or type 'quit' to exit.";

/// 经人设改写后输出
async fn say(voice: &Arc<dyn PersonaVoice>, input: &mut StdinInput, text: &str) -> Result<(), ConversationError> {
    let line = voice.transform(text).await;
    input.show(line.trim_end()).await
}

async fn print_itinerary(
    agent: &TravelAgent,
    input: &mut StdinInput,
    heading: &str,
    state: &SharedState,
) -> Result<(), ConversationError> {
    say(agent.voice(), input, heading).await?;
    let itinerary = state.get(ITINERARY).cloned().unwrap_or_default();
    let pretty = serde_json::to_string_pretty(&itinerary).unwrap_or_else(|_| itinerary.to_string());
    input.show(&pretty).await
}

/// 从入口开始逐步采集
async fn run_conversation(
    agent: &TravelAgent,
    input: &mut StdinInput,
    entry: &str,
    cancel: CancellationToken,
) -> Result<(), ConversationError> {
    let mut session = agent.new_session(cancel);
    session.start(entry, input).await?;
    print_itinerary(agent, input, "Final Itinerary:", session.state()).await
}

/// 出行灵感：生成、选择、直接出行程
async fn run_ideas(agent: &TravelAgent, input: &mut StdinInput, cancel: CancellationToken) -> anyhow::Result<()> {
    let ideas = agent.suggest_ideas(&cancel).await?;
    if ideas.prompts.is_empty() {
        input.show("No travel ideas were suggested.").await?;
        return Ok(());
    }
    say(agent.voice(), input, "Here are some Travel Ideas:").await?;
    for (idx, prompt) in ideas.prompts.iter().enumerate() {
        input.show(&format!("{}. {}", idx + 1, prompt.text)).await?;
    }

    let choice = input.read_line("Select a travel idea by number: ").await?;
    let selected = choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| ideas.prompts.get(i))
        .with_context(|| format!("'{}' is not one of the listed ideas", choice.trim()))?;

    let state = agent.itinerary_from_idea(&selected.text, &cancel).await?;
    print_itinerary(agent, input, "Final Itinerary from Suggested Prompts:", &state).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 日志：默认 info，可通过 RUST_LOG 覆盖；写到 stderr，不打断对话输出
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let secrets = Secrets::from_env();
    tracing::debug!(?secrets, "credentials");
    let agent = TravelAgent::from_config(cfg, &secrets).context("Failed to create travel agent")?;

    let supervisor = SessionSupervisor::new();
    supervisor.watch_ctrl_c();
    let shutdown = supervisor.root_token();

    let mut input = StdinInput::new();
    say(agent.voice(), &mut input, WELCOME).await?;

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            r = input.read_line(MENU) => r,
        };
        let choice = match line {
            Ok(l) => l.trim().to_lowercase(),
            Err(ConversationError::InputClosed) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        };

        match choice.as_str() {
            "quit" => {
                say(agent.voice(), &mut input, GOODBYE).await?;
                break;
            }
            "activities" | "destination" | "dates" => {
                let cancel = supervisor.begin();
                let outcome = run_conversation(&agent, &mut input, &choice, cancel).await;
                supervisor.end();
                match outcome {
                    Ok(()) => {}
                    Err(ConversationError::InputClosed) => break,
                    Err(e) => input.show(&format!("An error occurred: {e}")).await?,
                }
            }
            "ideas" => {
                let cancel = supervisor.begin();
                let outcome = run_ideas(&agent, &mut input, cancel).await;
                supervisor.end();
                if let Err(e) = outcome {
                    tracing::warn!(error = ?e, "ideas flow failed");
                    input.show(&format!("An error occurred: {e:#}")).await?;
                }
            }
            _ => input.show(INVALID_OPTION).await?,
        }
    }

    Ok(())
}
