//! System prompts for the single-prompt modes.

use std::fmt;

/// Which kind of answer the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Ask,
    Suggest,
    Explain,
    Chat,
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptMode::Ask => "ask",
            PromptMode::Suggest => "suggest",
            PromptMode::Explain => "explain",
            PromptMode::Chat => "chat",
        };
        f.write_str(name)
    }
}

const ASK_PROMPT: &str = "Provide a helpful and accurate response to the user's question.";

const EXPLAIN_PROMPT: &str = "Explain step-by-step with a short example if helpful.";

const SUGGEST_PROMPT: &str = "You are an expert technical assistant. The user is using a system \
with the following OS: {os}. Provide concise and practical suggestions to help the user accomplish \
their tasks efficiently. Focus on clarity and brevity, ensuring that your suggestions are easy to \
understand and implement. Tailor your suggestions to be relevant to the user's operating system and \
environment. Avoid lengthy explanations or unnecessary details; prefer single-line commands or code. \
If you must include explanations, keep commands and code on their own lines for easy copying.";

const DETAILED_SUGGEST_PROMPT: &str = "You are an expert technical assistant. The user is using a \
system with the following OS: {os}. When providing suggestions, give detailed, step-by-step \
instructions that the user can follow to achieve their goals. Include relevant commands, code \
snippets, or configurations as needed. Avoid unnecessary explanations or background information. \
Tailor your suggestions to be relevant to the user's operating system and environment.\n\
Attempt to make it a single line response where possible. Prefer commands and code snippets over \
lengthy explanations. Always leave commands and code on their own line for easy copying.";

/// System prompt for `mode`; chat runs without one.
pub fn system_prompt(mode: PromptMode, detailed_suggest: bool) -> Option<String> {
    match mode {
        PromptMode::Ask => Some(ASK_PROMPT.to_string()),
        PromptMode::Explain => Some(EXPLAIN_PROMPT.to_string()),
        PromptMode::Suggest => {
            let template = if detailed_suggest {
                DETAILED_SUGGEST_PROMPT
            } else {
                SUGGEST_PROMPT
            };
            Some(template.replace("{os}", &os_description()))
        }
        PromptMode::Chat => None,
    }
}

/// Describes the host OS for the suggest prompts.
pub fn os_description() -> String {
    describe_os(std::env::consts::OS, |name| {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    })
}

fn describe_os(platform: &str, env: impl Fn(&str) -> Option<String>) -> String {
    let hint_vars: &[&str] = match platform {
        "windows" | "macos" => &["OS_VERSION", "OS_RELEASE", "OS"],
        "linux" => &["OS_RELEASE", "OS", "LINUX_DISTRO"],
        _ => &[],
    };
    if let Some(hint) = hint_vars.iter().find_map(|name| env(name)) {
        return format!("{platform}: {hint}");
    }

    match platform {
        "windows" => "Windows",
        "macos" => "macOS",
        "linux" => "Linux",
        "freebsd" => "FreeBSD",
        "solaris" | "illumos" => "SunOS",
        "aix" => "AIX",
        _ => "Unknown OS",
    }
    .to_string()
}
