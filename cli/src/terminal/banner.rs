use colored::*;

use crate::terminal::print;

const BANNER: &str = r#"
      ____ ___  __(_)__  / /_____ ___  ____ _____
     / __ `/ / / / / _ \/ __/ __ `__ \/ __ `/ __ \
    / /_/ / /_/ / /  __/ /_/ / / / / / /_/ / /_/ /
    \__, /\__,_/_/\___/\__/_/ /_/ /_/\__,_/ .___/
      /_/                                /_/
"#;

pub fn print() {
    print::print(&format!("{}", BANNER.bright_green()));
}
