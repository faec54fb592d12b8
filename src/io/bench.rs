//! IO for .bench (ISCAS) files

use std::io::{BufRead, BufReader, Read, Write};

use fxhash::FxHashMap;
use itertools::Itertools;
use volute::Lut;

use crate::error::{Error, Result};
use crate::{Expr, Gate, Network, Node};

/// A gate statement: `name = TYPE(dep, ...)`
struct Statement {
    line: usize,
    name: String,
    gate: Gate,
    deps: Vec<String>,
}

fn parse_error(line: usize, msg: impl Into<String>) -> Error {
    Error::Parse {
        line,
        msg: msg.into(),
    }
}

/// Parse the type of a gate statement, given its number of inputs
fn parse_gate(line: usize, tp: &str, nb_deps: usize) -> Result<Gate> {
    let gate = match tp.to_uppercase().as_str() {
        "BUF" | "BUFF" => Gate::Buf,
        "NOT" => Gate::Not,
        "AND" => Gate::And,
        "NAND" => Gate::Nand,
        "OR" => Gate::Or,
        "NOR" => Gate::Nor,
        "XOR" => Gate::Xor,
        "XNOR" => Gate::Xnor,
        "VDD" => Gate::Const(true),
        "VSS" | "GND" => Gate::Const(false),
        _ => {
            let is_lut = tp.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("LUT 0x"));
            if is_lut {
                let hex = tp[6..].trim().to_lowercase();
                let lut = Lut::from_hex_string(nb_deps, &hex)
                    .map_err(|_| parse_error(line, format!("Invalid LUT value {hex}")))?;
                Gate::Cplx(Expr::from_lut(&lut))
            } else {
                return Err(parse_error(line, format!("Unknown gate type {tp}")));
            }
        }
    };
    if !gate.accepts_arity(nb_deps) {
        return Err(parse_error(
            line,
            format!("Gate {tp} does not accept {nb_deps} inputs"),
        ));
    }
    Ok(gate)
}

/// Build the network, adding the gates in topological order
fn network_from_statements(
    statements: Vec<Statement>,
    inputs: &[String],
    outputs: &[String],
) -> Result<Network> {
    let mut ret = Network::new();
    let mut name_to_node = FxHashMap::default();
    for name in inputs {
        let id = ret.add_input();
        if name_to_node.insert(name.clone(), id).is_some() {
            return Err(Error::DuplicateSignal(name.clone()));
        }
    }
    let mut name_to_statement = FxHashMap::default();
    for (i, s) in statements.iter().enumerate() {
        if name_to_node.contains_key(&s.name) || name_to_statement.insert(s.name.clone(), i).is_some()
        {
            return Err(Error::DuplicateSignal(s.name.clone()));
        }
    }

    // Depth-first traversal from each statement; a statement on the stack that is
    // reached again is part of a loop
    let mut on_stack = vec![false; statements.len()];
    for root in 0..statements.len() {
        if name_to_node.contains_key(&statements[root].name) {
            continue;
        }
        let mut stack = vec![(root, 0)];
        on_stack[root] = true;
        while let Some((i, pos)) = stack.pop() {
            let s = &statements[i];
            if pos < s.deps.len() {
                stack.push((i, pos + 1));
                let dep = &s.deps[pos];
                if name_to_node.contains_key(dep) {
                    continue;
                }
                match name_to_statement.get(dep) {
                    Some(&j) => {
                        if on_stack[j] {
                            return Err(Error::Cycle(dep.clone()));
                        }
                        on_stack[j] = true;
                        stack.push((j, 0));
                    }
                    None => {
                        // ABC-style naming for constant signals
                        let gate = match dep.as_str() {
                            "vdd" => Gate::Const(true),
                            "gnd" => Gate::Const(false),
                            _ => return Err(Error::UndefinedSignal(dep.clone())),
                        };
                        let id = ret.add_gate(gate, &[]);
                        name_to_node.insert(dep.clone(), id);
                    }
                }
            } else {
                let fanins = s.deps.iter().map(|d| name_to_node[d]).collect::<Vec<_>>();
                let id = ret.add_gate(s.gate.clone(), &fanins);
                name_to_node.insert(s.name.clone(), id);
                on_stack[i] = false;
            }
        }
    }
    for o in outputs {
        match name_to_node.get(o) {
            Some(&id) => ret.add_output(id),
            None => return Err(Error::UndefinedSignal(o.clone())),
        }
    }
    ret.check();
    Ok(ret)
}

/// Read a network in .bench format, as used by the ISCAS benchmarks
///
/// These files describe the design with simple statements like:
/// ```text
///     # This is a comment
///     INPUT(i0)
///     INPUT(i1)
///     x0 = AND(i0, i1)
///     x1 = NAND(x0, i1)
///     x2 = OR(x0, i0)
///     x3 = NOR(i0, x1)
///     x4 = XOR(x3, x2)
///     x5 = BUF(x4)
///     x6 = NOT(x5)
///     x7 = gnd
///     x8 = vdd
///     x9 = LUT 0xe8 (i0, i1, x0)
///     OUTPUT(x0)
/// ```
/// Statements may appear in any order.
pub fn read_bench<R: Read>(r: R) -> Result<Network> {
    let mut statements = Vec::new();
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (i, l) in BufReader::new(r).lines().enumerate() {
        let line = i + 1;
        let s = l?;
        let t = s.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if !t.contains('=') {
            let parts: Vec<_> = t
                .split(['(', ')'])
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.len() != 2 {
                return Err(parse_error(line, format!("Invalid statement {t}")));
            }
            if ["INPUT", "PINPUT"].contains(&parts[0]) {
                inputs.push(parts[1].to_string());
            } else if ["OUTPUT", "POUTPUT"].contains(&parts[0]) {
                outputs.push(parts[1].to_string());
            } else {
                return Err(parse_error(line, format!("Unknown keyword {}", parts[0])));
            }
        } else {
            let parts: Vec<_> = t
                .split(['=', '(', ',', ')'])
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.len() < 2 {
                return Err(parse_error(line, format!("Invalid statement {t}")));
            }
            let deps = parts[2..].to_vec();
            let gate = parse_gate(line, &parts[1], deps.len())?;
            statements.push(Statement {
                line,
                name: parts[0].clone(),
                gate,
                deps,
            });
        }
    }
    log::debug!(
        "Read {} inputs, {} outputs and {} gates, last gate at line {}",
        inputs.len(),
        outputs.len(),
        statements.len(),
        statements.last().map_or(0, |s| s.line)
    );
    network_from_statements(statements, &inputs, &outputs)
}

/// Name of a node in the written file
fn node_name(net: &Network, i: usize) -> String {
    match net.node(i) {
        Node::Input(idx) => format!("i{idx}"),
        Node::Logic(_, _) => format!("x{i}"),
    }
}

/// Write an expression as a tree of primitive gates; return the name of its output
fn write_expr<W: Write>(
    w: &mut W,
    e: &Expr,
    deps: &[String],
    prefix: &str,
    cnt: &mut usize,
) -> Result<String> {
    let name = format!("{prefix}_{cnt}");
    *cnt += 1;
    match e {
        Expr::Const(b) => writeln!(w, "{name} = {}", if *b { "vdd" } else { "gnd" })?,
        Expr::Lit(v, inv) => {
            let tp = if *inv { "NOT" } else { "BUFF" };
            writeln!(w, "{name} = {tp}({})", deps[*v])?;
        }
        Expr::And(c) | Expr::Or(c) | Expr::Xor(c) => {
            let tp = match e {
                Expr::And(_) => "AND",
                Expr::Or(_) => "OR",
                _ => "XOR",
            };
            let mut names = Vec::new();
            for sub in c {
                names.push(write_expr(w, sub, deps, prefix, cnt)?);
            }
            writeln!(w, "{name} = {tp}({})", names.join(", "))?;
        }
    }
    Ok(name)
}

/// Write a network in .bench format, as used by the ISCAS benchmarks
///
/// Inputs are named `i<index>` and gates `x<node>`. Complex gates are written as
/// LUTs when they have at most 6 inputs, and as a tree of primitive gates otherwise.
pub fn write_bench<W: Write>(w: &mut W, net: &Network) -> Result<()> {
    writeln!(w, "# .bench (ISCAS) file")?;
    writeln!(w, "# Generated by satpg")?;
    for i in 0..net.nb_inputs() {
        writeln!(w, "INPUT(i{})", i)?;
    }
    writeln!(w)?;
    for i in 0..net.nb_outputs() {
        writeln!(w, "OUTPUT({})", node_name(net, net.output(i)))?;
    }
    writeln!(w)?;
    for &i in net.logic() {
        let Node::Logic(g, fanins) = net.node(i) else {
            continue;
        };
        let deps = fanins.iter().map(|f| node_name(net, *f)).collect::<Vec<_>>();
        match g {
            Gate::Const(b) => writeln!(w, "x{} = {}", i, if *b { "vdd" } else { "gnd" })?,
            Gate::Cplx(e) if deps.len() <= 6 => {
                let lut = e.to_lut(deps.len());
                writeln!(
                    w,
                    "x{} = LUT 0x{}({})",
                    i,
                    lut.to_hex_string(),
                    deps.iter().join(", ")
                )?;
            }
            Gate::Cplx(e) => {
                let mut cnt = 0;
                let out = write_expr(w, e, &deps, &format!("x{i}"), &mut cnt)?;
                writeln!(w, "x{} = BUFF({})", i, out)?;
            }
            _ => writeln!(w, "x{} = {}({})", i, g.type_name(), deps.iter().join(", "))?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_bench, write_bench};
    use crate::error::Error;
    use crate::network::generators::testcases;
    use crate::{Gate, Node};

    #[test]
    fn test_basic_readwrite() {
        let example = "# .bench (ISCAS) file
INPUT(i0)
INPUT(i1)

OUTPUT(x0)
OUTPUT(x1)
OUTPUT(x2)
OUTPUT(x3)
OUTPUT(x4)
OUTPUT(x5)
OUTPUT(x6)

x0 = AND(i0, i1)
x1 = NAND(i0, i1)
x2 = OR(i0, i1)
x3 = NOR(i0, i1)
x4 = XOR(i0, i1)
x5 = BUF(i0)
x6 = NOT(i1)
x7 = NOT(x2)
x8 = gnd
x9 = vdd
x10 = XOR(  i0, i1 )
x11   =  gnd 
x12 = LUT 0x45fc (x0, x1, x2, x3)
";
        let net = read_bench(example.as_bytes()).unwrap();
        assert_eq!(net.nb_inputs(), 2);
        assert_eq!(net.nb_outputs(), 7);
        assert_eq!(net.nb_nodes(), 15);
        let mut buf = Vec::new();
        write_bench(&mut buf, &net).unwrap();
        let written = String::from_utf8(buf).unwrap();
        let net2 = read_bench(written.as_bytes()).unwrap();
        assert_eq!(net2.nb_inputs(), 2);
        assert_eq!(net2.nb_outputs(), 7);
        assert_eq!(net2.nb_nodes(), 15);
    }

    #[test]
    fn test_forward_reference() {
        let example = "INPUT(a)
INPUT(b)
OUTPUT(z)
z = NOT(y)
y = AND(a, b)
";
        let net = read_bench(example.as_bytes()).unwrap();
        assert_eq!(net.nb_nodes(), 4);
        let z = net.output(0);
        assert_eq!(net.node(z).gate(), Some(&Gate::Not));
        let y = net.fanins(z)[0];
        assert!(y < z);
        assert_eq!(net.node(y), &Node::Logic(Gate::And, vec![0, 1].into()));
    }

    #[test]
    fn test_case_insensitive() {
        let upper = "INPUT(a)\nINPUT(b)\nOUTPUT(y)\nOUTPUT(z)\nx = AND(a, b)\ny = LUT 0x6 (a, x)\nz = NOR(a, b)\n";
        let lower = "INPUT(a)\nINPUT(b)\nOUTPUT(y)\nOUTPUT(z)\nx = and(a, b)\ny = lut 0X6 (a, x)\nz = Nor(a, b)\n";
        let net = read_bench(upper.as_bytes()).unwrap();
        let net2 = read_bench(lower.as_bytes()).unwrap();
        assert_eq!(net2.nb_nodes(), net.nb_nodes());
        for i in 0..net.nb_nodes() {
            assert_eq!(net2.node(i), net.node(i));
        }
        assert!(matches!(net2.node(net2.output(0)).gate(), Some(Gate::Cplx(_))));
    }

    #[test]
    fn test_errors() {
        let cycle = "INPUT(a)\nOUTPUT(y)\nx = AND(a, y)\ny = NOT(x)\n";
        assert!(matches!(read_bench(cycle.as_bytes()), Err(Error::Cycle(_))));

        let undef = "INPUT(a)\nOUTPUT(y)\ny = AND(a, b)\n";
        assert!(matches!(
            read_bench(undef.as_bytes()),
            Err(Error::UndefinedSignal(_))
        ));

        let dup = "INPUT(a)\nOUTPUT(y)\ny = NOT(a)\ny = BUF(a)\n";
        assert!(matches!(
            read_bench(dup.as_bytes()),
            Err(Error::DuplicateSignal(_))
        ));

        let arity = "INPUT(a)\nINPUT(b)\nOUTPUT(y)\ny = NOT(a, b)\n";
        assert!(matches!(
            read_bench(arity.as_bytes()),
            Err(Error::Parse { line: 4, .. })
        ));

        let unknown = "INPUT(a)\nOUTPUT(y)\ny = FOO(a)\n";
        assert!(matches!(
            read_bench(unknown.as_bytes()),
            Err(Error::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_complex_roundtrip() {
        let net = testcases::complex_gates();
        let mut buf = Vec::new();
        write_bench(&mut buf, &net).unwrap();
        let net2 = read_bench(buf.as_slice()).unwrap();
        assert_eq!(net2.nb_inputs(), net.nb_inputs());
        assert_eq!(net2.nb_outputs(), net.nb_outputs());
        assert!(matches!(
            net2.node(net2.output(0)).gate(),
            Some(Gate::Cplx(_))
        ));
    }
}
