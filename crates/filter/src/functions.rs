//! Built-in implementations for OGC `Function` expressions.

use crate::error::FilterError;
use symbology_types::Value;

/// Dispatches a function call to the correct implementation.
///
/// Each argument is the full value list its expression produced; functions
/// use the first value of each argument.
pub fn evaluate_function(name: &str, args: Vec<Vec<Value>>) -> Result<Vec<Value>, FilterError> {
    match name {
        "strToUpperCase" => func_map_string(name, args, |s| s.to_uppercase()),
        "strToLowerCase" => func_map_string(name, args, |s| s.to_lowercase()),
        "strTrim" => func_map_string(name, args, |s| s.trim().to_string()),
        "strLength" => {
            let s = single_string(name, &args)?;
            Ok(vec![Value::Number(s.chars().count() as f64)])
        }
        "strConcat" | "Concatenate" => {
            let joined: String = args.iter().map(|a| first_string(a)).collect();
            Ok(vec![Value::String(joined)])
        }
        _ => Err(FilterError::FunctionError {
            function: name.to_string(),
            message: "Unknown function".to_string(),
        }),
    }
}

fn first_string(values: &[Value]) -> String {
    values.first().map(Value::to_string).unwrap_or_default()
}

fn single_string(name: &str, args: &[Vec<Value>]) -> Result<String, FilterError> {
    match args {
        [only] => Ok(first_string(only)),
        _ => Err(FilterError::FunctionError {
            function: name.to_string(),
            message: format!("expected 1 argument, got {}", args.len()),
        }),
    }
}

fn func_map_string(
    name: &str,
    args: Vec<Vec<Value>>,
    f: impl Fn(&str) -> String,
) -> Result<Vec<Value>, FilterError> {
    let s = single_string(name, &args)?;
    Ok(vec![Value::String(f(&s))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_case() {
        let out = evaluate_function("strToUpperCase", vec![vec![Value::from("main st")]]).unwrap();
        assert_eq!(out, vec![Value::from("MAIN ST")]);
    }

    #[test]
    fn test_concat_uses_first_values() {
        let out = evaluate_function(
            "strConcat",
            vec![vec![Value::from("A"), Value::from("ignored")], vec![Value::Number(7.0)]],
        )
        .unwrap();
        assert_eq!(out, vec![Value::from("A7")]);
    }

    #[test]
    fn test_length_arity() {
        assert!(evaluate_function("strLength", vec![]).is_err());
        assert_eq!(
            evaluate_function("strLength", vec![vec![Value::from("abc")]]).unwrap(),
            vec![Value::Number(3.0)]
        );
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(
            evaluate_function("nope", vec![]),
            Err(FilterError::FunctionError { .. })
        ));
    }
}
