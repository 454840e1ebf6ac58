const GREETING_REPLY: &str = "Hi! I'm your gateway to the ADE. I can implement stories, fix bugs, run tests and review code. What do you need?";
const SMALL_TALK_REPLY: &str = "All good and ready to work. Tell me what you want to build.";
const THANKS_REPLY: &str = "You're welcome! Message me whenever you need something else.";
const HELP_REPLY: &str = "I bridge this chat and the ADE (Autonomous Development Engine).\n\n\
I can help with:\n\
• Implementing user stories\n\
• Fixing bugs\n\
• Running tests and lint\n\
• Reviewing code\n\
• Any other development task\n\n\
Just describe what you need in plain language.";

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "yo",
    "hiya",
    "good morning",
    "good afternoon",
    "good evening",
    "oi",
    "olá",
    "ola",
    "bom dia",
    "boa tarde",
    "boa noite",
];
const SMALL_TALK: &[&str] = &["how are you", "how is it going", "what's up", "tudo bem"];
const THANKS: &[&str] = &["thanks", "thank you", "thx", "cheers", "obrigado", "obrigada", "valeu"];
const HELP: &[&str] = &["help", "what can you do", "ajuda"];

const DEV_WORDS: &[&str] = &[
    "implement", "create", "build", "develop", "code", "fix", "bug", "refactor", "test",
    "tests", "deploy", "push", "commit", "merge", "release", "story", "epic", "prd",
    "sprint", "backlog", "feature", "issue", "pr", "npm", "node", "git", "docker", "api",
    "database", "server", "endpoint", "route", "component", "module", "error",
    "exception", "log", "debug", "lint", "typecheck", "file", "folder", "function",
    "class", "method", "table",
];
const DEV_PREFIXES: &[&str] = &["implement", "develop", "refactor", "deploy", "debug"];
const AGENT_MENTIONS: &[&str] = &[
    "dev", "qa", "sm", "po", "pm", "architect", "devops", "analyst",
];

/// Canned answer for greetings, small talk, thanks and help requests that
/// carry no development vocabulary.
pub fn quick_reply(text: &str) -> Option<&'static str> {
    if is_dev_message(text) {
        return None;
    }
    let normalized = normalize(text);
    if starts_with_phrase(&normalized, GREETINGS) {
        return Some(GREETING_REPLY);
    }
    if is_whole_phrase(&normalized, SMALL_TALK) {
        return Some(SMALL_TALK_REPLY);
    }
    if starts_with_phrase(&normalized, THANKS) {
        return Some(THANKS_REPLY);
    }
    if is_whole_phrase(&normalized, HELP) {
        return Some(HELP_REPLY);
    }
    None
}

/// Whether `text` mentions development work, an agent (`@dev`) or an agent
/// command (`*develop`).
pub fn is_dev_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    let mentions_agent = lower.match_indices(['@', '*']).any(|(idx, marker)| {
        let word: String = lower[idx + 1..]
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        match marker {
            "@" => AGENT_MENTIONS.contains(&word.as_str()),
            _ => !word.is_empty(),
        }
    });
    mentions_agent
        || words(&lower).any(|word| {
            DEV_WORDS.contains(&word) || DEV_PREFIXES.iter().any(|prefix| word.starts_with(prefix))
        })
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
        .filter(|word| !word.is_empty())
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(['?', '!', '.'])
        .trim()
        .to_string()
}

fn starts_with_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        text.strip_prefix(phrase)
            .is_some_and(|rest| rest.chars().next().map_or(true, |ch| !ch.is_alphanumeric()))
    })
}

fn is_whole_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text == *phrase)
}
