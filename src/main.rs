#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    pretty_env_logger::init();
    log::info!("logger created");
    let mut args = std::env::args_os().skip(1);
    let path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: dice-roller <settings file> [command]");
            std::process::exit(2);
        }
    };
    let utils = RollUtils::new(path, 4, 1024).await;
    let command: Vec<String> = args.map(|a| a.to_string_lossy().into_owned()).collect();

    if !command.is_empty() {
        if let Some(result) = utils.eval(&command.join(" ")).await {
            print_result(&utils, result).await;
        }
        return;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(result) = utils.eval(&line).await {
                    print_result(&utils, result).await;
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::warn!("unable to read input: {}", err);
                break;
            }
        }
    }
}

use dice_roll::{DieResult, RollOutcome};
use roll_utils::{commands::HELP, CommandResult, RollUtils};
use std::{fmt::Write, path::PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

fn format_die(die: &DieResult) -> String {
    let mut text = if die.value != die.face {
        format!("{}->{}", die.face, die.value)
    } else {
        die.face.to_string()
    };
    if die.exploded {
        text.push('!');
    }
    if !die.kept {
        text = format!("~{}~", text);
    }
    text
}

/// Result line followed by one line per dice term. `show_formula` puts the
/// rolled formula in front of the total.
fn format_outcome(outcome: &RollOutcome, show_formula: bool) -> String {
    let mut text = if show_formula {
        match &outcome.alias {
            Some(alias) => format!(
                "{} ({}) = {}",
                alias, &outcome.formula, outcome.result.total
            ),
            None => format!("{} = {}", &outcome.formula, outcome.result.total),
        }
    } else {
        outcome.result.total.to_string()
    };
    for part in &outcome.result.breakdown {
        let dice: Vec<String> = part.dice.iter().map(format_die).collect();
        let _ = write!(
            text,
            "\n  {} [{}] = {}",
            &part.fragment,
            dice.join(", "),
            part.value
        );
    }
    text
}

async fn print_result(utils: &RollUtils, result: CommandResult) {
    let show_formula = utils.store().settings().await.display_results_inline;
    match result {
        CommandResult::Help => println!("{}", HELP),
        CommandResult::Settings(settings) => match toml::to_string(&settings) {
            Ok(text) => println!("{}", text.trim_end()),
            Err(err) => eprintln!("unable to show settings: {}", err),
        },
        CommandResult::AddAlias(Ok(())) => println!("formula saved"),
        CommandResult::EditAlias(Ok(())) => println!("formula updated"),
        CommandResult::RemoveAlias(Ok(entry)) => {
            println!("removed {} = {}", entry.alias, entry.formula)
        }
        CommandResult::AddAlias(Err(err))
        | CommandResult::EditAlias(Err(err))
        | CommandResult::RemoveAlias(Err(err)) => eprintln!("{}", err),
        CommandResult::ListAlias(entries) => {
            if entries.is_empty() {
                println!("no formulas saved");
            }
            for entry in entries {
                println!("{} = {}", entry.alias, entry.formula);
            }
        }
        CommandResult::Roll(Ok(outcome)) => println!("{}", format_outcome(&outcome, show_formula)),
        CommandResult::Repeat(Ok(outcomes)) => {
            for outcome in &outcomes {
                println!("{}", format_outcome(outcome, show_formula));
            }
        }
        CommandResult::Roll(Err(err)) | CommandResult::Repeat(Err(err)) => eprintln!("{}", err),
    }
}
