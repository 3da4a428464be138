//! Parameter lists and return signatures

use std::fmt;
use std::rc::Rc;

use super::super::errors::RuntimeError;
use super::values::{Marker, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Rc<str>,
    pub ty: Option<Rc<str>>,
}

/// Ordered parameters plus optional return types (`None` = unchecked)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    pub params: Vec<Param>,
    pub returns: Option<Vec<Rc<str>>>,
}

impl Params {
    /// Assemble a parameter list from the values collected between `(` and `)`.
    ///
    /// Names arrive as `Ref` (or `Op` when they shadow a builtin name), a
    /// symbol directly after a name is that name's type, and everything after
    /// the arrow marker is a return type.
    pub fn from_items(items: Vec<Value>) -> Result<Params, RuntimeError> {
        let mut params: Vec<Param> = Vec::new();
        let mut returns: Option<Vec<Rc<str>>> = None;

        for item in items {
            if let Some(returns) = returns.as_mut() {
                match item {
                    Value::Sym(ty) => returns.push(ty),
                    other => {
                        return Err(RuntimeError::type_mismatch(format!(
                            "return list expects type names, got {}",
                            other
                        )))
                    }
                }
                continue;
            }

            match item {
                Value::Ref(reference) => params.push(Param {
                    name: reference.name.clone(),
                    ty: None,
                }),
                Value::Op(op) => params.push(Param {
                    name: Rc::from(op.op.name()),
                    ty: None,
                }),
                Value::Sym(ty) => match params.last_mut() {
                    Some(param) if param.ty.is_none() => param.ty = Some(ty),
                    _ => {
                        return Err(RuntimeError::type_mismatch(format!(
                            "type `{}` does not follow a parameter name",
                            ty
                        )))
                    }
                },
                Value::Marker(Marker::Arrow) => returns = Some(Vec::new()),
                other => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "parameter list expects names, got {}",
                        other
                    )))
                }
            }
        }

        Ok(Params { params, returns })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.name)?;
            if let Some(ty) = &param.ty {
                write!(f, " :{}", ty)?;
            }
        }
        if let Some(returns) = &self.returns {
            write!(f, " ->")?;
            for ty in returns {
                write!(f, " :{}", ty)?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::super::token::Origin;
    use super::super::values::Reference;
    use super::*;

    fn name(n: &str) -> Value {
        Value::Ref(Rc::new(Reference {
            name: Rc::from(n),
            origin: Origin::default(),
        }))
    }

    #[test]
    fn test_names_types_and_returns() {
        let params = Params::from_items(vec![
            name("x"),
            Value::sym("Num"),
            name("y"),
            Value::Marker(Marker::Arrow),
            Value::sym("Bool"),
        ])
        .unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params.params[0].ty.as_deref(), Some("Num"));
        assert_eq!(params.params[1].ty, None);
        assert_eq!(params.returns, Some(vec![Rc::from("Bool")]));
        assert_eq!(params.to_string(), "(x :Num, y -> :Bool)");
    }

    #[test]
    fn test_empty_list_has_unchecked_returns() {
        let params = Params::from_items(Vec::new()).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.returns, None);
    }

    #[test]
    fn test_dangling_type_is_rejected() {
        assert!(Params::from_items(vec![Value::sym("Num")]).is_err());
    }

    #[test]
    fn test_arrow_never_lands_in_parameters() {
        let params = Params::from_items(vec![Value::Marker(Marker::Arrow)]).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.returns, Some(Vec::new()));
    }
}
