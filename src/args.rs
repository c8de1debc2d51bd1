use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = r###"
Enhancer turns rough prompts into structured ones using any OpenAI-compatible chat API.

Each prompt is rewritten into ROLE, OBJECTIVE, CONSTRAINTS and OUTPUT FORMAT sections:
- Roles: pick a built-in or custom role template to shape the rewrite.
- Suggestions: the model can suggest a better-suited role for the request.
- Library: save, export and import the prompts you want to keep.
- Usage: token counts and estimated cost are tracked per month.
"###
)]
pub struct Args {
    #[command(subcommand)]
    pub subcmd: Option<SubCommands>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    /// Enhance a prompt. Reads stdin when no prompt is given.
    Enhance(EnhanceSubCommand),
    /// Set, check or clear the stored API key.
    Key(KeySubCommand),
    /// Set or get settings stored alongside your data.
    Config(ConfigSubCommand),
    /// Manage saved prompts.
    Prompts(PromptsSubCommand),
    /// Manage role templates.
    Roles(RolesSubCommand),
    /// Show or reset token usage and cost.
    Usage(UsageSubCommand),
}

#[derive(Parser, Debug)]
#[command(about = "Enhance a prompt", long_about = None)]
pub struct EnhanceSubCommand {
    /// The prompt to enhance.
    pub prompt: Option<String>,

    /// Role template id or name.
    #[arg(short, long)]
    pub role: Option<String>,

    /// Model override for this call.
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Print the structured result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Save the enhanced prompt under this title.
    #[arg(short, long)]
    pub save: Option<String>,
}

#[derive(Parser, Debug)]
pub struct KeySubCommand {
    #[command(subcommand)]
    pub action: KeyAction,
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Validate and store an API key.
    Set {
        key: String,
        /// Store the key even if the service rejects it.
        #[arg(long)]
        force: bool,
    },
    /// Probe the stored key.
    Check,
    /// Remove the stored key.
    Clear,
}

#[derive(Parser, Debug)]
#[command(about = "Set or get settings", long_about = None)]
pub struct ConfigSubCommand {
    /// Set a setting value. Use the format key=value.
    /// `enhancer config --set model=gpt-4o`
    #[arg(short, long)]
    pub set: Option<String>,

    /// Get a setting value.
    /// `enhancer config --get model`
    #[arg(short, long)]
    pub get: Option<String>,
}

#[derive(Parser, Debug)]
pub struct PromptsSubCommand {
    #[command(subcommand)]
    pub action: PromptsAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List saved prompts, newest first.
    List,
    /// Print one saved prompt.
    Show { id: String },
    /// Save a new prompt.
    Save {
        #[arg(short, long)]
        title: String,
        /// Prompt text. Reads stdin when omitted.
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Change the title or content of a saved prompt.
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },
    Delete { id: String },
    /// Export saved prompts and custom roles as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Import prompts and custom roles from an export file.
    Import { file: String },
}

#[derive(Parser, Debug)]
pub struct RolesSubCommand {
    #[command(subcommand)]
    pub action: RolesAction,
}

#[derive(Subcommand, Debug)]
pub enum RolesAction {
    List,
    Show { id: String },
    /// Add a custom role template.
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        category: String,
        #[arg(short, long)]
        instructions: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Remove a custom role template.
    Remove { id: String },
}

#[derive(Parser, Debug)]
pub struct UsageSubCommand {
    /// Zero all counters.
    #[arg(long)]
    pub reset: bool,
}
