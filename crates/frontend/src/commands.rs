//! Built-in slash commands and their static replies.

use std::path::Path;
use sysbot_core::channel::{ChatId, Inbound};

pub const WELCOME_TEXT: &str = "\
🤖 Welcome to SysBot!

I'm an AI agent that can help you control and manage your system remotely.

What I can do:
📁 File & Directory Management
📝 Read, Create, Edit, Delete Files
🔄 Copy, Move, Rename Files
💻 Execute Shell Commands
🔐 Encrypt/Decrypt Files
📸 Capture Screenshots
🎥 Record Screen
📊 Get File Information
🔧 Change File Permissions

How to use:
Just chat with me naturally! Tell me what you want to do, and I'll handle it.

Examples:
• \"Show me the current directory\"
• \"List all files in the Documents folder\"
• \"Create a new file called test.txt with hello world\"
• \"Take a screenshot\"
• \"Encrypt all files in the current folder\"

Quick Commands:
/start - Show this welcome message
/help - Get help and examples
/clear - Clear conversation context
/info - Get system information";

pub const HELP_TEXT: &str = "\
📖 Help & Examples

File Operations:
• \"Show files in current directory\"
• \"Read the file config.txt\"
• \"Create a file named test.py with print('Hello')\"
• \"Delete the file old_data.txt\"
• \"Copy file1.txt to backup/file1.txt\"
• \"Rename document.txt to report.txt\"

Directory Operations:
• \"What's the current directory?\"
• \"Change to the Documents folder\"
• \"Create a new folder called Projects\"
• \"Delete the folder temp\"

System Operations:
• \"Execute command: ls -la\"
• \"Change permissions of file.sh to 755\"
• \"Get information about data.csv\"

Security Operations:
• \"Encrypt all files in current directory\"
• \"Decrypt all files in current directory\"

Screen Operations:
• \"Take a screenshot and save it as screen.png\"
• \"Record screen for 10 seconds\"

Tips:
✓ Be specific with file names and paths
✓ Check if files exist before trying to read or modify them
✓ Uploaded documents are saved in the current directory

Need something else? Just ask naturally!";

pub const CLEARED_TEXT: &str = "🗑️ Conversation context cleared! Starting fresh.";

pub const ONLINE_TEXT: &str = "🟢 SysBot is online";

/// A recognised slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Clear,
    Info,
}

impl Command {
    /// Parse the leading token of a message. Accepts a `@botname` suffix.
    /// Unknown commands return `None` and are treated as free text.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "clear" => Some(Self::Clear),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "N/A".into())
}

/// The `/info` reply for a session working in `cwd`.
pub fn info_text(cwd: &Path) -> String {
    format!(
        "💻 System Information\n\n\
         📂 Current Directory: {}\n\
         🖥️ OS: {} ({})\n\
         👤 User: {}\n\n\
         Use natural language to ask me to perform any system operation!",
        cwd.display(),
        std::env::consts::OS,
        std::env::consts::ARCH,
        current_user()
    )
}

/// Notice sent to admins when another chat issues `/start`.
pub fn new_user_notice(inbound: &Inbound) -> String {
    format!(
        "🔔 New User Activity\nUsername: @{}\nUser ID: {}\nFirst Name: {}",
        inbound.username.as_deref().unwrap_or("N/A"),
        inbound.chat_id,
        inbound.first_name.as_deref().unwrap_or("N/A")
    )
}

/// Admins to notify about `chat_id`: every listed chat except the sender.
pub fn notice_recipients(admins: impl Iterator<Item = ChatId>, chat_id: ChatId) -> Vec<ChatId> {
    admins.filter(|admin| *admin != chat_id).collect()
}
