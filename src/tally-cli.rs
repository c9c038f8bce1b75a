//! A simple CLI tool for recounting a poll offline.
//! This uses the server's own tally implementation, and is by definition
//! compatible with the output of our API endpoints.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use evoting_backend::model::api::results::PollDump;

const PROGRAM_NAME: &str = "tally-cli";

const ABOUT_TEXT: &str = "Recount the votes cast in a poll.

EXIT CODES:
     0: Recount succeeded.
   255: Ran successfully, but the dump holds votes for unknown candidates.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of a poll,\n\
as returned by `GET /polls/<poll_id>/dump`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(DUMP_PATH)
            .help(DUMP_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// This many votes name a candidate who is not in the dump.
    StrayVotes(usize),
}

/// One candidate's line in the recount.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResults {
    pub candidate_name: String,
    pub votes: u64,
    pub winner: bool,
}

impl Display for FriendlyResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{}{}",
            self.candidate_name,
            self.votes,
            if self.votes != 1 { "s" } else { "" },
            if self.winner { " (winner)" } else { "" }
        )
    }
}

/// Load a dump and recount it.
fn recount(path: &str) -> Result<Vec<FriendlyResults>, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: PollDump = serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Every vote must be for a listed candidate.
    let stray = dump.stray_votes();
    if stray > 0 {
        return Err(Error::StrayVotes(stray));
    }

    // Turn into a list ordered by votes, then name.
    let tally = dump.tally();
    let mut results_list = dump
        .candidates
        .iter()
        .map(|candidate| FriendlyResults {
            candidate_name: candidate.name.clone(),
            votes: tally.count(&candidate.id),
            winner: tally.is_winner(&candidate.id),
        })
        .collect::<Vec<_>>();
    results_list.sort_unstable_by(|a, b| a.candidate_name.cmp(&b.candidate_name));
    results_list.sort_by(|a, b| b.votes.cmp(&a.votes));

    Ok(results_list)
}

/// Run the recount, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let Some(path) = args.get_one::<String>(DUMP_PATH) else {
        println!("No dump path given");
        return 2;
    };
    match recount(path) {
        Ok(friendly_results) => {
            let total: u64 = friendly_results.iter().map(|r| r.votes).sum();
            println!("Recount succeeded: {total} vote{} cast.", if total != 1 { "s" } else { "" });
            for result in friendly_results {
                println!("{result}");
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::StrayVotes(count)) => {
            println!("Recount failed: {count} vote(s) for candidates not standing in this poll.");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
