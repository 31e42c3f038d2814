use clap::Parser;

/// Log in to the ticket backend and resume at the requested page
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Account username
    #[arg(short, long)]
    pub username: String,

    /// Account password
    #[arg(short, long, env = "TICKET_LOGIN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Query string of the page that sent us to login, e.g. "redirect=/tickets&ticket=7&action=view"
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Session file path (overrides sessionFile from config)
    #[arg(long)]
    pub session_file: Option<String>,
}
