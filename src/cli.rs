// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn category_arg() -> Arg {
    Arg::new("category")
        .long("category")
        .short('c')
        .required(true)
        .help("Category name")
}

pub fn build_cli() -> Command {
    Command::new("fintrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-currency expense tracking with rolling category limits")
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .global(true)
                .env("FINTRACK_USER")
                .value_parser(value_parser!(i64))
                .help("Telegram id of the acting user"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Path of the SQLite database (overrides FINTRACK_DB)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("user")
                .about("Register and manage users")
                .subcommand(
                    Command::new("register")
                        .arg(
                            Arg::new("tg-id")
                                .long("tg-id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("username").long("username").required(true)),
                )
                .subcommand(Command::new("delete").about("Delete the user and all their data"))
                .subcommand(
                    Command::new("currency")
                        .about("Show or set the reporting currency")
                        .arg(Arg::new("code").long("set")),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(Command::new("add").arg(Arg::new("name").long("name").required(true)))
                .subcommand(json_flags(
                    Command::new("list").arg(
                        Arg::new("deleted")
                            .long("deleted")
                            .action(ArgAction::SetTrue)
                            .help("List soft-deleted categories instead"),
                    ),
                ))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true)))
                .subcommand(
                    Command::new("restore").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("rename")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ),
        )
        .subcommand(
            Command::new("currency")
                .about("Exchange rates")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("set-rate")
                        .arg(Arg::new("code").long("code").required(true))
                        .arg(
                            Arg::new("rate")
                                .long("rate")
                                .required(true)
                                .help("Value of one unit in base units"),
                        )
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("symbol").long("symbol")),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and list transactions")
                .subcommand(
                    Command::new("add")
                        .arg(category_arg())
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true)
                                .help("Amount; prefix with + for income"),
                        )
                        .arg(
                            Arg::new("income")
                                .long("income")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(Arg::new("currency").long("currency"))
                        .arg(Arg::new("comment").long("comment")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("category").long("category").short('c'))
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("limit")
                .about("Spending limits per category")
                .subcommand(
                    Command::new("set")
                        .arg(category_arg())
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("period")
                                .long("period")
                                .required(true)
                                .help("<N>d, day, week, month, year or custom"),
                        )
                        .arg(
                            Arg::new("auto-renew")
                                .long("auto-renew")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(Arg::new("currency").long("currency"))
                        .arg(Arg::new("start").long("start").help("YYYY-MM-DD"))
                        .arg(
                            Arg::new("end")
                                .long("end")
                                .help("YYYY-MM-DD, required for custom"),
                        ),
                )
                .subcommand(json_flags(Command::new("show")))
                .subcommand(
                    Command::new("check").arg(category_arg()).arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue),
                    ),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Reports")
                .subcommand(
                    Command::new("category").arg(category_arg()).arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue),
                    ),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Totals in the reporting currency")
                .subcommand(json_flags(Command::new("expenses")))
                .subcommand(json_flags(Command::new("income")))
                .subcommand(json_flags(Command::new("monthly-expenses")))
                .subcommand(json_flags(Command::new("monthly-income")))
                .subcommand(json_flags(
                    Command::new("trailing").arg(
                        Arg::new("months")
                            .long("months")
                            .value_parser(value_parser!(u32).range(1..=120)),
                    ),
                )),
        )
        .subcommand(
            Command::new("sweep")
                .about("Periodic maintenance")
                .subcommand(Command::new("rollover").about("Advance expired auto-renewing limits"))
                .subcommand(
                    Command::new("purge")
                        .about("Hard-delete old soft-deleted categories")
                        .arg(
                            Arg::new("retention-days")
                                .long("retention-days")
                                .value_parser(value_parser!(i64).range(0..)),
                        ),
                ),
        )
        .subcommand(Command::new("chat").about("Interactive session on stdin"))
        .subcommand(Command::new("doctor").about("Check data consistency"))
}
