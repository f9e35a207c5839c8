//! MathML to expression conversion
//!
//! Converts content MathML as used by SBML into [`Expr`] trees. Identifiers are
//! resolved through a [`NameResolver`], so the same builder serves kinetic
//! laws, rules and initial assignments.

use crate::{
    model::expr::{BinaryOp, Expr, Function},
    sbml::{
        error::SBMLError,
        ident::{AVOGADRO_URI, DELAY_URI, RATE_OF_URI, TIME_URI},
        xml::{XmlElement, XmlNode},
    },
};

/// The value of the Avogadro constant used for the `avogadro` symbol.
pub const AVOGADRO: f64 = 6.02214076e23;

/// Maps SBML identifiers in math to expressions.
pub trait NameResolver {
    /// Resolves an identifier used in a `<ci>` element.
    fn resolve(&self, name: &str) -> Result<Expr, SBMLError>;

    /// The expression standing for simulation time.
    fn time(&self) -> Expr;
}

/// Converts the single expression inside a `<math>` element.
pub fn build_expression(math: &XmlElement, resolver: &dyn NameResolver) -> Result<Expr, SBMLError> {
    let mut children = math.elements();
    match (children.next(), children.next()) {
        (Some(child), None) => build(child, resolver),
        (None, _) => Err(SBMLError::InvalidMath(
            "<math> element contains no expression".to_string(),
        )),
        (Some(_), Some(_)) => Err(SBMLError::InvalidMath(
            "<math> element contains more than one expression".to_string(),
        )),
    }
}

fn build(element: &XmlElement, resolver: &dyn NameResolver) -> Result<Expr, SBMLError> {
    match element.name.as_str() {
        "cn" => parse_number(element).map(Expr::Number),
        "ci" => {
            let name = element.text();
            if name == TIME_URI {
                return Err(SBMLError::UnresolvedName(name));
            }
            resolver.resolve(&name)
        }
        "csymbol" => build_symbol(element, resolver),
        "apply" => build_apply(element, resolver),
        "piecewise" => build_piecewise(element, resolver),
        "semantics" => {
            let first = element
                .elements()
                .find(|e| e.name != "annotation" && e.name != "annotation-xml")
                .ok_or_else(|| SBMLError::InvalidMath("empty <semantics> element".to_string()))?;
            build(first, resolver)
        }
        "true" => Ok(Expr::Number(1.0)),
        "false" => Ok(Expr::Number(0.0)),
        "pi" => Ok(Expr::Number(std::f64::consts::PI)),
        "exponentiale" => Ok(Expr::Number(std::f64::consts::E)),
        "infinity" => Ok(Expr::Number(f64::INFINITY)),
        "notanumber" => Ok(Expr::Number(f64::NAN)),
        "lambda" => Err(SBMLError::FunctionDefinitions),
        other => Err(SBMLError::UnsupportedMath(other.to_string())),
    }
}

fn build_symbol(element: &XmlElement, resolver: &dyn NameResolver) -> Result<Expr, SBMLError> {
    match element.attribute("definitionURL").map(str::trim) {
        Some(TIME_URI) => Ok(resolver.time()),
        Some(AVOGADRO_URI) => Ok(Expr::Number(AVOGADRO)),
        Some(DELAY_URI) => Err(SBMLError::UnsupportedMath("csymbol delay".to_string())),
        Some(RATE_OF_URI) => Err(SBMLError::UnsupportedMath("csymbol rateOf".to_string())),
        Some(other) => Err(SBMLError::UnsupportedMath(format!("csymbol {}", other))),
        None => Err(SBMLError::InvalidMath(
            "<csymbol> without definitionURL".to_string(),
        )),
    }
}

/// Splits the text of an element at `<sep/>` markers.
fn separated_parts(element: &XmlElement) -> Vec<String> {
    let mut parts = vec![String::new()];
    for child in &element.children {
        match child {
            XmlNode::Text(text) => {
                if let Some(last) = parts.last_mut() {
                    last.push_str(text);
                }
            }
            XmlNode::Element(e) if e.name == "sep" => parts.push(String::new()),
            XmlNode::Element(_) => {}
        }
    }
    parts.iter().map(|p| p.trim().to_string()).collect()
}

fn parse_float(text: &str) -> Result<f64, SBMLError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| SBMLError::InvalidMath(format!("unable to parse number \"{}\"", text)))
}

fn parse_number(element: &XmlElement) -> Result<f64, SBMLError> {
    if let Some(base) = element.attribute("base") {
        if base.trim() != "10" {
            return Err(SBMLError::UnsupportedMath(format!("cn with base {}", base)));
        }
    }

    let kind = element.attribute("type").unwrap_or("real");
    let parts = separated_parts(element);
    match (kind, parts.as_slice()) {
        ("real" | "integer" | "double", [value]) => parse_float(value),
        ("e-notation", [mantissa, exponent]) => {
            Ok(parse_float(mantissa)? * 10f64.powf(parse_float(exponent)?))
        }
        ("rational", [numerator, denominator]) => {
            Ok(parse_float(numerator)? / parse_float(denominator)?)
        }
        ("real" | "integer" | "double" | "e-notation" | "rational", _) => Err(
            SBMLError::InvalidMath(format!("malformed <cn type=\"{}\"> element", kind)),
        ),
        (other, _) => Err(SBMLError::UnsupportedMath(format!("cn type {}", other))),
    }
}

fn build_piecewise(element: &XmlElement, resolver: &dyn NameResolver) -> Result<Expr, SBMLError> {
    let mut pieces = Vec::new();
    let mut otherwise = None;

    for child in element.elements() {
        let operands = child.elements().collect::<Vec<_>>();
        match (child.name.as_str(), operands.as_slice()) {
            ("piece", [value, condition]) => {
                pieces.push((build(condition, resolver)?, build(value, resolver)?))
            }
            ("piece", _) => {
                return Err(SBMLError::OperatorArity {
                    operator: "piece".to_string(),
                    expected: "exactly 2 operands",
                })
            }
            ("otherwise", [value]) => otherwise = Some(Box::new(build(value, resolver)?)),
            ("otherwise", _) => {
                return Err(SBMLError::OperatorArity {
                    operator: "otherwise".to_string(),
                    expected: "exactly 1 operand",
                })
            }
            (other, _) => return Err(SBMLError::UnsupportedMath(other.to_string())),
        }
    }

    if pieces.is_empty() {
        return match otherwise {
            Some(value) => Ok(*value),
            None => Err(SBMLError::MissingOperand("piecewise".to_string())),
        };
    }
    Ok(Expr::Piecewise(pieces, otherwise))
}

/// Qualifier elements that modify an operator rather than being operands.
const QUALIFIERS: [&str; 3] = ["degree", "logbase", "bvar"];

fn build_apply(element: &XmlElement, resolver: &dyn NameResolver) -> Result<Expr, SBMLError> {
    let mut children = element.elements();
    let operator = children
        .next()
        .ok_or_else(|| SBMLError::MissingOperand("apply".to_string()))?;
    match operator.name.as_str() {
        "ci" | "lambda" => return Err(SBMLError::FunctionDefinitions),
        "csymbol" => return build_symbol(operator, resolver),
        _ => {}
    }

    let mut qualifiers = Vec::new();
    let mut operands = Vec::new();
    for child in children {
        if QUALIFIERS.contains(&child.name.as_str()) {
            qualifiers.push(child);
        } else {
            operands.push(build(child, resolver)?);
        }
    }

    let qualifier = |name: &str| -> Result<Option<Expr>, SBMLError> {
        qualifiers
            .iter()
            .find(|q| q.name == name)
            .map(|q| {
                let inner = q.elements().next().ok_or_else(|| {
                    SBMLError::InvalidMath(format!("empty <{}> qualifier", name))
                })?;
                build(inner, resolver)
            })
            .transpose()
    };

    let name = operator.name.as_str();
    match name {
        "plus" => fold_nary(name, operands, BinaryOp::Add),
        "times" => fold_nary(name, operands, BinaryOp::Mul),
        "and" => fold_nary(name, operands, BinaryOp::And),
        "or" => fold_nary(name, operands, BinaryOp::Or),
        "xor" => {
            let mut operands = nonempty(name, operands)?.into_iter();
            let first = operands
                .next()
                .ok_or_else(|| SBMLError::MissingOperand(name.to_string()))?;
            Ok(operands.fold(first, xor))
        }
        "minus" => {
            let mut operands = take(name, operands, 1, 2, "1 or 2 operands")?.into_iter();
            match (operands.next(), operands.next()) {
                (Some(left), Some(right)) => Ok(Expr::binary(BinaryOp::Sub, left, right)),
                (Some(operand), None) => Ok(Expr::neg(operand)),
                _ => Err(SBMLError::MissingOperand(name.to_string())),
            }
        }
        "divide" => binary(name, operands, BinaryOp::Div),
        "power" => binary(name, operands, BinaryOp::Pow),
        "quotient" => binary(name, operands, BinaryOp::Quotient),
        "rem" => binary(name, operands, BinaryOp::Remainder),
        "implies" => {
            let [a, b] = pair(name, operands)?;
            Ok(Expr::binary(BinaryOp::Or, Expr::not(a), b))
        }
        "eq" => chain(name, operands, BinaryOp::Equal),
        "neq" => {
            let [a, b] = pair(name, operands)?;
            Ok(Expr::binary(BinaryOp::NotEqual, a, b))
        }
        "gt" => chain(name, operands, BinaryOp::Greater),
        "lt" => chain(name, operands, BinaryOp::Less),
        "geq" => chain(name, operands, BinaryOp::GreaterEqual),
        "leq" => chain(name, operands, BinaryOp::LessEqual),
        "not" => Ok(Expr::not(single(name, operands)?)),
        "max" => fold_call(name, operands, Function::Max),
        "min" => fold_call(name, operands, Function::Min),
        "root" => {
            let x = single(name, operands)?;
            match qualifier("degree")? {
                None => Ok(Expr::call(Function::Sqrt, vec![x])),
                Some(Expr::Number(degree)) if degree == 2.0 => {
                    Ok(Expr::call(Function::Sqrt, vec![x]))
                }
                Some(degree) => Ok(Expr::binary(
                    BinaryOp::Pow,
                    x,
                    Expr::binary(BinaryOp::Div, Expr::Number(1.0), degree),
                )),
            }
        }
        "log" => {
            let x = single(name, operands)?;
            match qualifier("logbase")? {
                None => Ok(Expr::call(Function::Log10, vec![x])),
                Some(Expr::Number(base)) if base == 10.0 => {
                    Ok(Expr::call(Function::Log10, vec![x]))
                }
                Some(base) => Ok(Expr::call(Function::Log, vec![x, base])),
            }
        }
        "ln" => unary(name, operands, Function::Log),
        "exp" => unary(name, operands, Function::Exp),
        "abs" => unary(name, operands, Function::Abs),
        "floor" => unary(name, operands, Function::Floor),
        "ceiling" => unary(name, operands, Function::Ceil),
        "sin" => unary(name, operands, Function::Sin),
        "cos" => unary(name, operands, Function::Cos),
        "tan" => unary(name, operands, Function::Tan),
        "arcsin" => unary(name, operands, Function::ASin),
        "arccos" => unary(name, operands, Function::ACos),
        "arctan" => unary(name, operands, Function::ATan),
        "sec" => Ok(reciprocal(Expr::call(Function::Cos, vec![single(name, operands)?]))),
        "csc" => Ok(reciprocal(Expr::call(Function::Sin, vec![single(name, operands)?]))),
        "cot" => Ok(reciprocal(Expr::call(Function::Tan, vec![single(name, operands)?]))),
        "arcsec" => Ok(Expr::call(Function::ACos, vec![reciprocal(single(name, operands)?)])),
        "arccsc" => Ok(Expr::call(Function::ASin, vec![reciprocal(single(name, operands)?)])),
        "arccot" => Ok(Expr::call(Function::ATan, vec![reciprocal(single(name, operands)?)])),
        "sinh" => Ok(sinh(single(name, operands)?)),
        "cosh" => Ok(cosh(single(name, operands)?)),
        "tanh" => Ok(tanh(single(name, operands)?)),
        "sech" => Ok(reciprocal(cosh(single(name, operands)?))),
        "csch" => Ok(reciprocal(sinh(single(name, operands)?))),
        "coth" => Ok(reciprocal(tanh(single(name, operands)?))),
        "arcsinh" => Ok(arcsinh(single(name, operands)?)),
        "arccosh" => Ok(arccosh(single(name, operands)?)),
        "arctanh" => {
            let x = single(name, operands)?;
            Ok(half_log_ratio(
                Expr::binary(BinaryOp::Add, Expr::Number(1.0), x.clone()),
                Expr::binary(BinaryOp::Sub, Expr::Number(1.0), x),
            ))
        }
        "arcsech" => Ok(arccosh(reciprocal(single(name, operands)?))),
        "arccsch" => Ok(arcsinh(reciprocal(single(name, operands)?))),
        "arccoth" => {
            let x = single(name, operands)?;
            Ok(half_log_ratio(
                Expr::binary(BinaryOp::Add, x.clone(), Expr::Number(1.0)),
                Expr::binary(BinaryOp::Sub, x, Expr::Number(1.0)),
            ))
        }
        other => Err(SBMLError::UnsupportedMath(other.to_string())),
    }
}

fn nonempty(operator: &str, operands: Vec<Expr>) -> Result<Vec<Expr>, SBMLError> {
    if operands.is_empty() {
        return Err(SBMLError::MissingOperand(operator.to_string()));
    }
    Ok(operands)
}

/// Checks that the operand count lies in `min..=max`.
fn take(
    operator: &str,
    operands: Vec<Expr>,
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<Vec<Expr>, SBMLError> {
    let operands = nonempty(operator, operands)?;
    if operands.len() < min || operands.len() > max {
        return Err(SBMLError::OperatorArity {
            operator: operator.to_string(),
            expected,
        });
    }
    Ok(operands)
}

fn single(operator: &str, operands: Vec<Expr>) -> Result<Expr, SBMLError> {
    let mut operands = take(operator, operands, 1, 1, "exactly 1 operand")?;
    operands
        .pop()
        .ok_or_else(|| SBMLError::MissingOperand(operator.to_string()))
}

fn pair(operator: &str, operands: Vec<Expr>) -> Result<[Expr; 2], SBMLError> {
    let operands = take(operator, operands, 2, 2, "exactly 2 operands")?;
    <[Expr; 2]>::try_from(operands).map_err(|_| SBMLError::OperatorArity {
        operator: operator.to_string(),
        expected: "exactly 2 operands",
    })
}

fn binary(operator: &str, operands: Vec<Expr>, op: BinaryOp) -> Result<Expr, SBMLError> {
    let [a, b] = pair(operator, operands)?;
    Ok(Expr::binary(op, a, b))
}

fn unary(operator: &str, operands: Vec<Expr>, function: Function) -> Result<Expr, SBMLError> {
    Ok(Expr::call(function, vec![single(operator, operands)?]))
}

/// Folds an n-ary operator from the left. A single operand is returned as is.
fn fold_nary(operator: &str, operands: Vec<Expr>, op: BinaryOp) -> Result<Expr, SBMLError> {
    let mut operands = nonempty(operator, operands)?.into_iter();
    let first = operands
        .next()
        .ok_or_else(|| SBMLError::MissingOperand(operator.to_string()))?;
    Ok(operands.fold(first, |acc, next| Expr::binary(op, acc, next)))
}

fn fold_call(operator: &str, operands: Vec<Expr>, function: Function) -> Result<Expr, SBMLError> {
    let mut operands = nonempty(operator, operands)?.into_iter();
    let first = operands
        .next()
        .ok_or_else(|| SBMLError::MissingOperand(operator.to_string()))?;
    Ok(operands.fold(first, |acc, next| Expr::call(function, vec![acc, next])))
}

/// `a < b < c` becomes `a < b and b < c`.
fn chain(operator: &str, operands: Vec<Expr>, op: BinaryOp) -> Result<Expr, SBMLError> {
    let operands = take(operator, operands, 2, usize::MAX, "at least 2 operands")?;
    let comparisons = operands
        .windows(2)
        .map(|w| Expr::binary(op, w[0].clone(), w[1].clone()))
        .collect::<Vec<_>>();
    fold_nary(operator, comparisons, BinaryOp::And)
}

fn xor(a: Expr, b: Expr) -> Expr {
    Expr::binary(
        BinaryOp::And,
        Expr::binary(BinaryOp::Or, a.clone(), b.clone()),
        Expr::not(Expr::binary(BinaryOp::And, a, b)),
    )
}

fn reciprocal(x: Expr) -> Expr {
    Expr::binary(BinaryOp::Div, Expr::Number(1.0), x)
}

fn exp(x: Expr) -> Expr {
    Expr::call(Function::Exp, vec![x])
}

fn sinh(x: Expr) -> Expr {
    Expr::binary(
        BinaryOp::Mul,
        Expr::Number(0.5),
        Expr::binary(BinaryOp::Sub, exp(x.clone()), exp(Expr::neg(x))),
    )
}

fn cosh(x: Expr) -> Expr {
    Expr::binary(
        BinaryOp::Mul,
        Expr::Number(0.5),
        Expr::binary(BinaryOp::Add, exp(x.clone()), exp(Expr::neg(x))),
    )
}

fn tanh(x: Expr) -> Expr {
    let e2x = exp(Expr::binary(BinaryOp::Mul, Expr::Number(2.0), x));
    Expr::binary(
        BinaryOp::Div,
        Expr::binary(BinaryOp::Sub, e2x.clone(), Expr::Number(1.0)),
        Expr::binary(BinaryOp::Add, e2x, Expr::Number(1.0)),
    )
}

fn arcsinh(x: Expr) -> Expr {
    let square = Expr::binary(BinaryOp::Pow, x.clone(), Expr::Number(2.0));
    let root = Expr::call(
        Function::Sqrt,
        vec![Expr::binary(BinaryOp::Add, square, Expr::Number(1.0))],
    );
    Expr::call(Function::Log, vec![Expr::binary(BinaryOp::Add, x, root)])
}

fn arccosh(x: Expr) -> Expr {
    let square = Expr::binary(BinaryOp::Pow, x.clone(), Expr::Number(2.0));
    let root = Expr::call(
        Function::Sqrt,
        vec![Expr::binary(BinaryOp::Sub, square, Expr::Number(1.0))],
    );
    Expr::call(Function::Log, vec![Expr::binary(BinaryOp::Add, x, root)])
}

/// `0.5 * log(a / b)`
fn half_log_ratio(a: Expr, b: Expr) -> Expr {
    Expr::binary(
        BinaryOp::Mul,
        Expr::Number(0.5),
        Expr::call(Function::Log, vec![Expr::binary(BinaryOp::Div, a, b)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Names;

    impl NameResolver for Names {
        fn resolve(&self, name: &str) -> Result<Expr, SBMLError> {
            match name {
                "x" | "y" | "z" => Ok(Expr::name(format!("c.{}", name))),
                other => Err(SBMLError::UnresolvedName(other.to_string())),
            }
        }

        fn time(&self) -> Expr {
            Expr::name("myokit.time")
        }
    }

    fn parse(body: &str) -> Result<Expr, SBMLError> {
        let xml = format!(
            r#"<math xmlns="http://www.w3.org/1998/Math/MathML">{}</math>"#,
            body
        );
        build_expression(&XmlElement::parse(&xml).unwrap(), &Names)
    }

    fn code(body: &str) -> String {
        parse(body).unwrap().to_string()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(code("<cn>2.5</cn>"), "2.5");
        assert_eq!(code(r#"<cn type="integer"> 3 </cn>"#), "3");
        assert_eq!(code(r#"<cn type="e-notation">1<sep/>3</cn>"#), "1000");
        assert_eq!(code(r#"<cn type="rational">1<sep/>4</cn>"#), "0.25");
        assert!(matches!(
            parse("<cn>abc</cn>"),
            Err(SBMLError::InvalidMath(_))
        ));
    }

    #[test]
    fn test_nary_operators() {
        assert_eq!(
            code("<apply><plus/><ci>x</ci><ci>y</ci><ci>z</ci></apply>"),
            "c.x + c.y + c.z"
        );
        assert_eq!(code("<apply><times/><ci>x</ci></apply>"), "c.x");
        assert_eq!(
            code("<apply><minus/><apply><plus/><ci>x</ci><ci>y</ci></apply></apply>"),
            "-(c.x + c.y)"
        );
        assert_eq!(
            code("<apply><lt/><ci>x</ci><ci>y</ci><ci>z</ci></apply>"),
            "c.x < c.y and c.y < c.z"
        );
    }

    #[test]
    fn test_symbols_and_constants() {
        let time = r#"<csymbol encoding="text" definitionURL="http://www.sbml.org/sbml/symbols/time">t</csymbol>"#;
        assert_eq!(code(time), "myokit.time");

        let avogadro =
            r#"<csymbol definitionURL="http://www.sbml.org/sbml/symbols/avogadro">NA</csymbol>"#;
        assert_relative_eq!(parse(avogadro).unwrap().eval(&|_| None).unwrap(), AVOGADRO);

        assert_relative_eq!(
            parse("<pi/>").unwrap().eval(&|_| None).unwrap(),
            std::f64::consts::PI
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(code("<apply><root/><ci>x</ci></apply>"), "sqrt(c.x)");
        assert_eq!(
            code("<apply><root/><degree><cn>3</cn></degree><ci>x</ci></apply>"),
            "c.x ^ (1 / 3)"
        );
        assert_eq!(code("<apply><log/><ci>x</ci></apply>"), "log10(c.x)");
        assert_eq!(
            code("<apply><log/><logbase><cn>2</cn></logbase><ci>x</ci></apply>"),
            "log(c.x, 2)"
        );
        assert_eq!(code("<apply><ln/><ci>x</ci></apply>"), "log(c.x)");
        assert_eq!(code("<apply><sec/><ci>x</ci></apply>"), "1 / cos(c.x)");
    }

    #[test]
    fn test_hyperbolic_values() {
        let value = |op: &str| {
            parse(&format!("<apply><{}/><cn>0.5</cn></apply>", op))
                .unwrap()
                .eval(&|_| None)
                .unwrap()
        };
        assert_relative_eq!(value("sinh"), 0.5f64.sinh(), epsilon = 1e-12);
        assert_relative_eq!(value("cosh"), 0.5f64.cosh(), epsilon = 1e-12);
        assert_relative_eq!(value("tanh"), 0.5f64.tanh(), epsilon = 1e-12);
        assert_relative_eq!(value("arcsinh"), 0.5f64.asinh(), epsilon = 1e-12);
        assert_relative_eq!(value("arctanh"), 0.5f64.atanh(), epsilon = 1e-12);
    }

    #[test]
    fn test_piecewise() {
        let expr = parse(
            "<piecewise>\
                <piece><cn>1</cn><apply><gt/><ci>x</ci><cn>0</cn></apply></piece>\
                <otherwise><cn>2</cn></otherwise>\
            </piecewise>",
        )
        .unwrap();
        assert_eq!(expr.to_string(), "piecewise(c.x > 0, 1, 2)");
        assert_eq!(expr.eval(&|_| Some(-1.0)), Some(2.0));
    }

    #[test]
    fn test_operand_errors() {
        let err = parse("<apply><minus/></apply>").unwrap_err();
        assert!(err.to_string().starts_with("Operator needs at least one operand"));

        let err = parse("<apply><divide/><ci>x</ci></apply>").unwrap_err();
        assert_eq!(err.to_string(), "Operator <divide> needs exactly 2 operands.");

        let err = parse("<apply><minus/><ci>x</ci><ci>y</ci><ci>z</ci></apply>").unwrap_err();
        assert!(matches!(err, SBMLError::OperatorArity { .. }));
    }

    #[test]
    fn test_unsupported_and_unresolved() {
        let err = parse("<apply><ci>f</ci><ci>x</ci></apply>").unwrap_err();
        assert_eq!(err, SBMLError::FunctionDefinitions);

        let err = parse("<apply><factorial/><ci>x</ci></apply>").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported MathML element <factorial>.");

        let err = parse("<ci>unknown</ci>").unwrap_err();
        assert!(err.to_string().starts_with("Unable to create Name:"));

        let err = build_expression(&XmlElement::parse("<math/>").unwrap(), &Names).unwrap_err();
        assert!(matches!(err, SBMLError::InvalidMath(_)));
    }
}
