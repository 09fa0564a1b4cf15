//! Recursive list definitions, built once and evaluated on concrete inputs.
//!
//! Builds `length`, `append`, `reverse`, `contains`, `map`, `filter` and `fold` over
//! symbolic lists, prints the resulting expressions and evaluates them.
//!
//! **Usage**:
//! ```bash
//! cargo run --example recursion -- 5
//! cargo run --example recursion -- 8 --dot
//! ```

use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::eyre;
use log::info;
use zen_rs::arith::{mk_add, mk_lt, mk_mul};
use zen_rs::definitions::{append, contains, definition_count, filter, fold, length, map, reverse};
use zen_rs::dot::to_dot;
use zen_rs::inspect::{size, DagDump};
use zen_rs::interpreter::{Environment, Interpreter};
use zen_rs::lambda::Lambda;
use zen_rs::node::{mk_arbitrary, mk_int, Expr};
use zen_rs::object::mk_get_field;
use zen_rs::types::{IntType, Type};
use zen_rs::value::Value;

#[derive(Debug, Parser)]
#[command(name = "recursion")]
#[command(about = "Evaluate recursive list definitions", long_about = None)]
struct Cli {
    /// Length of the input lists
    #[arg(value_name = "N", default_value = "5")]
    n: usize,

    /// Print the DOT graph of every expression
    #[arg(long)]
    dot: bool,

    /// Print every expression node by node
    #[arg(long)]
    dump: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    let time_total = Instant::now();

    let element = Type::int(IntType::I32);
    let list = Type::list(element.clone());
    let xs = mk_arbitrary(list.clone());
    let ys = mk_arbitrary(list.clone());
    let x = mk_arbitrary(element.clone());

    let double = Lambda::function(element.clone(), |v| mk_mul(v, &mk_int(IntType::I32, 2)))?;
    let is_small = Lambda::function(element.clone(), |v| mk_lt(v, &mk_int(IntType::I32, 3)))?;
    let sum = Lambda::function(Type::pair(element.clone(), element.clone()), |p| {
        mk_add(&mk_get_field(p, "item1")?, &mk_get_field(p, "item2")?)
    })?;

    let exprs: Vec<(&str, Expr)> = vec![
        ("length(xs)", length(&xs)?),
        ("append(xs, ys)", append(&xs, &ys)?),
        ("reverse(xs)", reverse(&xs)?),
        ("contains(xs, x)", contains(&xs, &x)?),
        ("map(double, xs)", map(&xs, &double)?),
        ("filter(is_small, xs)", filter(&xs, &is_small)?),
        ("fold(sum, xs, 0)", fold(&xs, &mk_int(IntType::I32, 0), &sum)?),
        ("length(append(xs, reverse(ys)))", length(&append(&xs, &reverse(&ys)?)?)?),
    ];
    info!("Built {} expressions from {} definitions", exprs.len(), definition_count());

    let items = |offset: i32| -> color_eyre::Result<Value> {
        let values = (0..args.n as i32).map(|i| Value::i32(i + offset)).collect();
        Ok(Value::list(element.clone(), values)?)
    };
    let (xs_value, ys_value) = (items(0)?, items(10)?);
    println!("xs = {}", xs_value);
    println!("ys = {}", ys_value);
    println!("x  = 2");

    let mut env = Environment::new();
    for (var, value) in [(&xs, xs_value), (&ys, ys_value), (&x, Value::i32(2))] {
        let id = var.var_id().ok_or_else(|| eyre!("{} is not a symbolic input", var))?;
        env.assign(id, value);
    }

    for (name, e) in exprs.iter() {
        println!("----------------------------------");
        println!("{} = {}", name, e);
        println!("size: {}", size(e));

        let time_eval = Instant::now();
        let mut interpreter = Interpreter::new(&env);
        let value = interpreter.evaluate(e)?;
        println!("value: {}", value);
        println!(
            "cache: {} entries, {} hits, {} misses, {} frames",
            interpreter.cache_size(),
            interpreter.cache_hits(),
            interpreter.cache_misses(),
            interpreter.frame_count()
        );
        println!("Evaluated in {:.3} ms", time_eval.elapsed().as_secs_f64() * 1000.0);

        if args.dump {
            print!("{}", DagDump::new(e));
        }
        if args.dot {
            println!("{}", to_dot(&[e.clone()])?);
        }
    }

    println!("----------------------------------");
    println!("Definitions cached: {}", definition_count());
    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
