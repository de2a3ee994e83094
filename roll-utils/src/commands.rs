use dice_roll::FormulaEntry;
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{digit1, multispace0, multispace1, satisfy},
    combinator::{eof, map, map_res, recognize, rest, verify},
    multi::many1,
    sequence::{pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use unicode_categories::UnicodeCategories;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Settings,
    AddAlias(FormulaEntry),
    EditAlias(String, FormulaEntry),
    RemoveAlias(String),
    ListAliases,
    Repeat(u32, String),
    Roll(String),
}

pub const HELP: &str = "\
commands:
  roll <formula> | r <formula>      roll dice notation or a saved formula
  repeat <n> <formula>              roll a formula n times
  alias add <name> <formula>        save a formula
  alias edit <old> <name> <formula> rename or change a saved formula
  alias remove <name>               delete a saved formula
  alias list                        list saved formulas
  settings                          show the current settings
  help                              show this text
any other line is rolled as it is, a saved formula wins over a command";

fn chars_set(input: &str) -> IResult<&str, char> {
    satisfy(|c| !(c.is_separator() || c.is_other() || c.is_whitespace()))(input)
}

fn parse_name(input: &str) -> IResult<&str, String> {
    map(recognize(many1(chars_set)), str::to_owned)(input)
}

/// Rest of the line, at least one visible character.
fn parse_formula(input: &str) -> IResult<&str, String> {
    map(verify(rest, |s: &str| !s.trim().is_empty()), |s: &str| {
        s.trim().to_owned()
    })(input)
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    map(tag_no_case("help"), |_| Command::Help)(input)
}

fn parse_settings(input: &str) -> IResult<&str, Command> {
    map(tag_no_case("settings"), |_| Command::Settings)(input)
}

fn parse_roll_command(input: &str) -> IResult<&str, Command> {
    preceded(
        pair(alt((tag_no_case("roll"), tag_no_case("r"))), multispace1),
        map(parse_formula, Command::Roll),
    )(input)
}

fn parse_repeat(input: &str) -> IResult<&str, Command> {
    preceded(
        pair(tag_no_case("repeat"), multispace1),
        map(
            separated_pair(
                map_res(digit1, |d: &str| d.parse::<u32>()),
                multispace1,
                parse_formula,
            ),
            |(times, formula)| Command::Repeat(times, formula),
        ),
    )(input)
}

fn parse_alias(input: &str) -> IResult<&str, Command> {
    preceded(
        pair(alt((tag_no_case("alias"), tag_no_case("a"))), multispace1),
        alt((
            preceded(
                pair(alt((tag_no_case("add"), tag_no_case("a"))), multispace1),
                map(
                    separated_pair(parse_name, multispace1, parse_formula),
                    |(alias, formula)| Command::AddAlias(FormulaEntry { alias, formula }),
                ),
            ),
            preceded(
                pair(alt((tag_no_case("edit"), tag_no_case("e"))), multispace1),
                map(
                    tuple((
                        terminated(parse_name, multispace1),
                        terminated(parse_name, multispace1),
                        parse_formula,
                    )),
                    |(old, alias, formula)| {
                        Command::EditAlias(old, FormulaEntry { alias, formula })
                    },
                ),
            ),
            preceded(
                pair(alt((tag_no_case("remove"), tag_no_case("r"))), multispace1),
                map(parse_name, Command::RemoveAlias),
            ),
            map(alt((tag_no_case("list"), tag_no_case("l"))), |_| {
                Command::ListAliases
            }),
        )),
    )(input)
}

fn parse_command(input: &str) -> IResult<&str, Command> {
    terminated(
        alt((
            parse_repeat,
            parse_roll_command,
            parse_alias,
            parse_settings,
            parse_help,
        )),
        pair(multispace0, eof),
    )(input)
}

/// Reads one input line. Lines that are no command are rolled as they are;
/// blank lines yield nothing.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else if let Ok((_, command)) = parse_command(line) {
        Some(command)
    } else {
        Some(Command::Roll(line.to_owned()))
    }
}

pub fn parse_logging(line: &str) -> Option<Command> {
    let command = parse(line);
    log::info!("{:?}", &command);
    command
}
