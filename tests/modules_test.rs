use css_module_deps::CssMode;
use css_module_deps::CssModule;
use css_module_deps::CssParser;
use css_module_deps::CssParserOptions;
use css_module_deps::Dependency;
use css_module_deps::IcssExportKind;
use css_module_deps::LocalIdentOptions;
use css_module_deps::Range;
use css_module_deps::Warning;
use indoc::indoc;
use linked_hash_map::LinkedHashMap;

const RESOURCE: &str = "./input.module.css";

fn local_name(options: &LocalIdentOptions, name: &str) -> String {
    options.css_local_ident(RESOURCE, "input", name)
}

fn push_export(exports: &mut LinkedHashMap<String, Vec<String>>, key: &str, value: String) {
    let values = exports.entry(key.to_string()).or_insert_with(Vec::new);
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Renames locals with `_input__[local]`, inlines ICSS symbols and appends the exports.
fn transform(input: &str) -> (String, Vec<Warning<'_>>) {
    let parser = CssParser::new(CssParserOptions {
        default_mode: CssMode::Auto,
        ..Default::default()
    })
    .unwrap();
    let mut module = CssModule::new(RESOURCE);
    parser.parse(input, &mut module).unwrap();

    let options = LocalIdentOptions::new("_[id]__[local]");
    let mut replacements: Vec<(Range, String)> = Vec::new();
    let mut exports: LinkedHashMap<String, Vec<String>> = LinkedHashMap::new();
    for dependency in module.dependencies() {
        match dependency {
            Dependency::LocalIdentifier {
                name,
                range,
                prefix,
                ..
            } => {
                let new_name = format!("{prefix}{}", local_name(&options, name));
                push_export(&mut exports, &format!("{prefix}{name}"), new_name.clone());
                replacements.push((*range, new_name));
            }
            Dependency::SelfLocalIdentifier {
                name,
                range,
                prefix,
                composes_into,
                ..
            } => {
                let new_name = format!("{prefix}{}", local_name(&options, name));
                match composes_into {
                    Some(owner) => push_export(&mut exports, owner, new_name),
                    None => replacements.push((*range, new_name)),
                }
            }
            Dependency::IcssImport {
                request,
                name,
                range,
                prefix,
                composes_into,
                ..
            } => {
                let imported = format!("{prefix}{name}@{request}");
                match composes_into {
                    Some(owner) => push_export(&mut exports, owner, imported),
                    None => replacements.push((*range, imported)),
                }
            }
            Dependency::IcssExport {
                name, value, kind, ..
            } => match kind {
                IcssExportKind::Value => {
                    exports.insert(name.to_string(), vec![value.to_string()]);
                }
                IcssExportKind::ComposesGlobal => {
                    push_export(&mut exports, name, value.to_string())
                }
            },
            Dependency::IcssSymbol { value, range, .. } => {
                replacements.push((*range, value.to_string()));
            }
            Dependency::Import { range, .. } => replacements.push((*range, String::new())),
            Dependency::Url { .. } | Dependency::StaticExports { .. } => {}
        }
    }
    for dependency in module.presentational_dependencies() {
        replacements.push((dependency.range, dependency.content.to_string()));
    }
    replacements.sort_by_key(|(range, _)| range.start);

    let mut result = String::new();
    let mut index = 0;
    for (range, content) in replacements {
        if (range.start as usize) < index {
            continue;
        }
        result += &input[index..range.start as usize];
        result += &content;
        index = range.end as usize;
    }
    result += &input[index..];
    if !exports.is_empty() {
        result += "\n:export {\n";
        for (key, value) in exports {
            result += "    ";
            result += &key;
            result += ": ";
            result += &value.join(" ");
            result += ";\n";
        }
        result += "}\n";
    }
    let (_, warnings) = module.into_parts();
    (result, warnings)
}

fn test(input: &str, expected: &str) {
    let (actual, warnings) = transform(input);
    assert!(warnings.is_empty(), "{}", &warnings[0]);
    similar_asserts::assert_eq!(expected, actual);
}

#[test]
fn at_rule() {
    test(
        indoc! {r#"
            :local(.otherClass) {
                background: red;
            }

            @media screen {
                :local(.foo) {
                    color: green;
                    :local(.baz) {
                        color: blue;
                    }
                }
            }
        "#},
        indoc! {r#"
            ._input__otherClass {
                background: red;
            }

            @media screen {
                ._input__foo {
                    color: green;
                    ._input__baz {
                        color: blue;
                    }
                }
            }

            :export {
                otherClass: _input__otherClass;
                foo: _input__foo;
                baz: _input__baz;
            }
        "#},
    );
}

#[test]
fn at_rule_scope() {
    test(
        indoc! {r#"
            :local(.d) {
                color: red;
            }

            @scope (:local(.a)) to (:local(.b)) {
                :local(.c) {
                    border: 5px solid black;
                    background-color: goldenrod;
                }
            }
        "#},
        indoc! {r#"
            ._input__d {
                color: red;
            }

            @scope (._input__a) to (._input__b) {
                ._input__c {
                    border: 5px solid black;
                    background-color: goldenrod;
                }
            }

            :export {
                d: _input__d;
                a: _input__a;
                b: _input__b;
                c: _input__c;
            }
        "#},
    );
}

#[test]
fn bare_global_and_local() {
    test(
        indoc! {r#"
            .a :global .b .c {
                color: red;
            }

            :global .d :local .e {
                color: blue;
            }
        "#},
        indoc! {r#"
            ._input__a .b .c {
                color: red;
            }

            .d ._input__e {
                color: blue;
            }

            :export {
                a: _input__a;
                e: _input__e;
            }
        "#},
    );
}

#[test]
fn composes() {
    test(
        indoc! {r#"
            .a {
                color: red;
            }

            .b { composes: a; composes: c from "./c.css"; composes: d from global; background: blue; }
        "#},
        indoc! {r#"
            ._input__a {
                color: red;
            }

            ._input__b {    background: blue; }

            :export {
                a: _input__a;
                b: _input__b _input__a c@./c.css d;
            }
        "#},
    );
}

#[test]
fn values() {
    test(
        indoc! {r#"
            /* values */
            @value primary: #BF4040;
            @value colors: "./colors.css";
            @value accent from colors;

            .a {
                color: primary;
                border-color: accent;
            }
        "#},
        indoc! {r#"
            /* values */




            ._input__a {
                color: #BF4040;
                border-color: accent@./colors.css;
            }

            :export {
                primary: #BF4040;
                colors: "./colors.css";
                a: _input__a;
            }
        "#},
    );
}

#[test]
fn custom_properties_and_keyframes() {
    test(
        indoc! {r#"
            :root {
                --color: red;
            }

            @keyframes spin {
                to {
                    transform: rotate(360deg);
                }
            }

            .a {
                color: var(--color);
                animation: spin 1s linear infinite;
            }
        "#},
        indoc! {r#"
            :root {
                --_input__color: red;
            }

            @keyframes _input__spin {
                to {
                    transform: rotate(360deg);
                }
            }

            ._input__a {
                color: var(--_input__color);
                animation: _input__spin 1s linear infinite;
            }

            :export {
                --color: --_input__color;
                spin: _input__spin;
                a: _input__a;
            }
        "#},
    );
}

#[test]
fn icss_blocks() {
    test(
        indoc! {r#"
            /* icss */
            :import("./colors.css") {
                i__blue: blue;
            }

            :export {
                primary: i__blue;
            }

            .a {
                color: i__blue;
            }
        "#},
        indoc! {r#"
            /* icss */




            ._input__a {
                color: blue@./colors.css;
            }

            :export {
                primary: blue;
                a: _input__a;
            }
        "#},
    );
}

#[test]
fn imports_are_removed() {
    test(
        indoc! {r#"
            @import "./base.css";
            .a { background: url(./a.png); }
        "#},
        indoc! {r#"
            ._input__a { background: url(./a.png); }

            :export {
                a: _input__a;
            }
        "#},
    );
}
