use shared::ExtensionError;
use shared::ExtensionError::MalformedModuleArgument;

//Constructor arguments of a virtual table declaration. They arrive as
//raw text, one string per argument: either a bare positional
//sub-expression or name=(sub-expression). The parenthesized value is
//kept verbatim, including the parentheses, so it can be handed back
//to the host session as a sub-query.
#[derive(Debug)]
pub struct TableArguments {
    positional: Vec<String>,
    named: Vec<(String, String)>,
}

impl TableArguments {
    pub fn parse(raw_arguments: &[String]) -> Result<TableArguments, ExtensionError> {
        let mut positional = Vec::new();
        let mut named = Vec::new();

        for raw_argument in raw_arguments {
            let trimmed = raw_argument.trim();

            match Self::split_named(trimmed) {
                Some((name, value)) => {
                    if !value.starts_with('(') || !value.ends_with(')') || !Self::parens_balanced(value) {
                        return Err(MalformedModuleArgument(trimmed.to_string()));
                    }
                    named.push((name.to_string(), value.to_string()));
                },
                None => positional.push(trimmed.to_string()),
            }
        }

        Ok(TableArguments { positional, named })
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(|argument| argument.as_str())
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.iter()
            .find(|(argument_name, _)| argument_name == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn named_or_err(&self, name: &'static str) -> Result<&str, ExtensionError> {
        self.named(name).ok_or(ExtensionError::MissingModuleArgument(name))
    }

    //An argument is named when everything before the first '=' is a
    //plain identifier. Anything else is a positional sub-expression,
    //which may itself contain '='.
    fn split_named(argument: &str) -> Option<(&str, &str)> {
        let equals_index = argument.find('=')?;
        let name = &argument[..equals_index];

        if name.is_empty() {
            return None;
        }
        let is_identifier = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.chars().next().unwrap().is_ascii_digit();
        if !is_identifier {
            return None;
        }

        Some((name, argument[equals_index + 1..].trim_start()))
    }

    fn parens_balanced(value: &str) -> bool {
        let mut depth: i32 = 0;
        for c in value.chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                },
                _ => {}
            }
        }
        depth == 0
    }
}
