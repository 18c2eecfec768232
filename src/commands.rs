/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "recent",
    aliases: &["home", "h"],
    description: "Latest posts in the community",
  },
  Command {
    name: "posts",
    aliases: &["p", "board"],
    description: "Browse, search and sort posts",
  },
  Command {
    name: "services",
    aliases: &["s", "directory"],
    description: "Community service directory",
  },
  Command {
    name: "purge",
    aliases: &["clear-cache"],
    description: "Drop every cached list",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit hearth",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable sort keeps declaration order among equal ranks
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; None when the command doesn't match at all
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  let aliases = cmd.aliases.iter();
  if cmd.name == input {
    Some(0)
  } else if aliases.clone().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases.clone().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if aliases.clone().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(get_suggestions("posts")[0].name, "posts");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("home")[0].name, "recent");
    assert_eq!(get_suggestions("s")[0].name, "services");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("serv")[0].name, "services");
    assert_eq!(get_suggestions("pu")[0].name, "purge");
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(get_suggestions("cent")[0].name, "recent");
    assert_eq!(get_suggestions("cache")[0].name, "purge");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
