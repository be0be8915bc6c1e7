use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notevault", bin_name = "notevault", version, disable_help_subcommand = true)]
#[command(about = "Inspect and maintain a notevault storage root", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Storage root (defaults to the OS data directory)
    #[arg(long, global = true, help_heading = "Options")]
    pub root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a folder (the root when omitted)
    #[command(alias = "list", display_order = 1)]
    Ls {
        /// Folder id or prefix
        folder: Option<String>,
    },

    /// Show the whole folder tree
    #[command(display_order = 2)]
    Tree,

    /// Create a document with one blank page
    #[command(alias = "n", display_order = 3)]
    New {
        /// Document name (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Create inside this folder
        #[arg(long = "in", short = 'i')]
        inside: Option<String>,
    },

    /// Create a folder
    #[command(display_order = 4)]
    Mkdir {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Create inside this folder
        #[arg(long = "in", short = 'i')]
        inside: Option<String>,
    },

    /// Move a document or folder (to the root when --to is omitted)
    #[command(display_order = 10)]
    Mv {
        id: String,

        #[arg(long)]
        to: Option<String>,
    },

    /// Rename a document or folder
    #[command(display_order = 11)]
    Rename {
        id: String,

        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Delete a document or folder (folders take their contents with them)
    #[command(alias = "delete", display_order = 12)]
    Rm {
        id: String,

        /// Skip the trash
        #[arg(long)]
        permanent: bool,
    },

    /// Print the folder path from the root down to a folder
    #[command(display_order = 13)]
    Path { folder: String },

    /// Trash management
    #[command(display_order = 20)]
    Trash {
        #[command(subcommand)]
        action: TrashCommands,
    },

    /// Clean up interrupted writes and report quarantined records
    #[command(display_order = 30)]
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum TrashCommands {
    /// List deleted items, newest first
    Ls,

    /// Bring a deleted item back
    Restore { id: String },

    /// Delete a trash record for good
    Purge { id: String },

    /// Purge everything in the trash
    Empty,

    /// Purge records past the retention window
    Sweep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_joins_name_words() {
        let cli = Cli::try_parse_from(["notevault", "new", "Lecture", "Notes", "--in", "ab12"]).unwrap();
        match cli.command {
            Commands::New { name, inside } => {
                assert_eq!(name.join(" "), "Lecture Notes");
                assert_eq!(inside.as_deref(), Some("ab12"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["notevault", "tree", "--root", "/tmp/vault", "-v"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/vault")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_rm_permanent_flag() {
        let cli = Cli::try_parse_from(["notevault", "rm", "1234abcd", "--permanent"]).unwrap();
        assert!(matches!(cli.command, Commands::Rm { permanent: true, .. }));
    }

    #[test]
    fn test_trash_subcommands() {
        let cli = Cli::try_parse_from(["notevault", "trash", "restore", "beef"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Trash { action: TrashCommands::Restore { ref id } } if id == "beef"
        ));
        assert!(Cli::try_parse_from(["notevault", "trash"]).is_err());
    }

    #[test]
    fn test_mv_without_target_means_root() {
        let cli = Cli::try_parse_from(["notevault", "mv", "cafe"]).unwrap();
        assert!(matches!(cli.command, Commands::Mv { to: None, .. }));
    }
}
