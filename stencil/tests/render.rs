//! Rendering compiled templates against context values.

use indoc::indoc;
use insta::assert_snapshot;
use std::sync::Arc;
use stencil::{
    Escape, ObjectType, RenderError, Template, TemplateConfig, Type, Value, compile, compile_with,
};

fn product_type() -> Arc<ObjectType> {
    ObjectType::builder("Product")
        .field("name", Type::String)
        .field("price", Type::Int)
        .field("inStock", Type::Bool)
        .method("priceWithTax", [Type::Int], Type::Int, |this, args| {
            match (this.get("price"), &args[0]) {
                (Some(Value::Int(price)), Value::Int(percent)) => {
                    Ok(Value::Int(price + price * percent / 100))
                }
                _ => Err("price is not an int".into()),
            }
        })
        .build()
}

fn page_type() -> Arc<ObjectType> {
    ObjectType::builder("Page")
        .field("title", Type::String)
        .field("html", Type::String)
        .field("show", Type::Bool)
        .field("outer", Type::list(Type::Int))
        .field("inner", Type::list(Type::Int))
        .field("products", Type::list(Type::object(product_type())))
        .method("greet", [Type::String], Type::String, |_, args| {
            Ok(Value::from(format!("Hello, {}!", args[0].to_text())))
        })
        .build()
}

fn product(name: &str, price: i64, in_stock: bool) -> Value {
    Value::object([
        ("name", Value::from(name)),
        ("price", Value::from(price)),
        ("inStock", Value::from(in_stock)),
    ])
}

fn page() -> Value {
    Value::object([
        ("title", Value::from("Shop")),
        ("html", Value::from("<b>hi</b>")),
        ("show", Value::from(true)),
        ("outer", Value::from(vec![1, 2])),
        ("inner", Value::from(vec![10, 20])),
        (
            "products",
            Value::from(vec![
                product("pen", 100, true),
                product("ink", 250, false),
                product("pad", 40, true),
            ]),
        ),
    ])
}

fn template(text: &str) -> Template {
    compile("page.html", text, page_type()).unwrap()
}

fn render(text: &str) -> String {
    template(text).render(&page()).unwrap()
}

fn strip_tags(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[test]
fn test_interpolation() {
    stencil_testhelpers::setup();

    let name_type = ObjectType::builder("Person")
        .field("name", Type::String)
        .build();
    let template = compile("p.html", "<p>#{name}</p>", name_type).unwrap();
    let out = template.render(&Value::object([("name", "Ann")])).unwrap();
    assert_eq!(out, "<p>Ann</p>");
}

#[test]
fn test_nested_loops_keep_order() {
    stencil_testhelpers::setup();

    let out = render(r#"<div c:for="i:outer"><p c:for="j:inner">#{i}-#{j} </p></div>"#);
    assert_snapshot!(out, @"<div><p>1-10 </p><p>1-20 </p></div><div><p>2-10 </p><p>2-20 </p></div>");
    assert_eq!(strip_tags(&out), "1-10 1-20 2-10 2-20 ");
}

#[test]
fn test_loop_over_list_literal() {
    stencil_testhelpers::setup();

    let out = render(r#"<i c:for="n:[3, 2, 1]">#{n}</i>"#);
    assert_eq!(out, "<i>3</i><i>2</i><i>1</i>");
}

#[test]
fn test_loop_variable_shadowing_is_restored() {
    stencil_testhelpers::setup();

    let out = render(r#"<div c:for="x:outer"><i c:for="x:inner">#{x}</i>#{x}</div>"#);
    assert_snapshot!(out, @"<div><i>10</i><i>20</i>1</div><div><i>10</i><i>20</i>2</div>");

    // a loop variable may shadow a root field of another type
    let out = render(r#"<p c:for="title:outer">#{title}</p>#{title}"#);
    assert_eq!(out, "<p>1</p><p>2</p>Shop");
}

#[test]
fn test_object_loop_with_fields_and_methods() {
    stencil_testhelpers::setup();

    let out = render(indoc! {r#"
        <ul>
          <li c:for="p:products">#{p.name}: #{p.priceWithTax(10)}</li>
        </ul>
    "#});
    assert_snapshot!(out, @r"
    <ul>
      <li>pen: 110</li><li>ink: 275</li><li>pad: 44</li>
    </ul>
    ");
}

#[test]
fn test_conditionals() {
    stencil_testhelpers::setup();

    let out = render(r#"<p c:if="show">yes</p><p c:if="!show">no</p>"#);
    assert_eq!(out, "<p>yes</p>");

    // c:for is the outer construct; the condition sees the loop variable
    let out = render(r#"<li c:for="p:products" c:if="p.inStock">#{p.name}</li>"#);
    assert_eq!(out, "<li>pen</li><li>pad</li>");

    let out = render(r#"<b c:if="!products.isEmpty()">#{products.size()} items</b>"#);
    assert_eq!(out, "<b>3 items</b>");
}

#[test]
fn test_text_and_html_content() {
    stencil_testhelpers::setup();

    let out = render(r#"<p c:text="html">placeholder</p><div c:html="html"></div>"#);
    assert_snapshot!(out, @"<p>&lt;b&gt;hi&lt;/b&gt;</p><div><b>hi</b></div>");
}

#[test]
fn test_dynamic_attributes() {
    stencil_testhelpers::setup();

    let out = render(r#"<a href="/static" c:title="title" class='x' data-n=3 hidden>link</a>"#);
    assert_eq!(
        out,
        r#"<a href="/static" title="Shop" class='x' data-n=3 hidden>link</a>"#
    );

    let out = render(r#"<input type="checkbox" c:checked="show" c:disabled="!show"/>"#);
    assert_eq!(out, r#"<input type="checkbox" checked/>"#);
}

#[test]
fn test_null_attribute_is_omitted() {
    stencil_testhelpers::setup();

    let mut context = page();
    if let Value::Object(fields) = &mut context {
        fields.insert("title".to_string(), Value::Null);
    }
    let out = template(r#"<img src="a.png" c:alt="title">#{title}."#)
        .render(&context)
        .unwrap();
    assert_eq!(out, r#"<img src="a.png">."#);
}

#[test]
fn test_values_are_escaped_but_static_text_is_not() {
    stencil_testhelpers::setup();

    let person = ObjectType::builder("Person")
        .field("name", Type::String)
        .build();
    let template = compile(
        "p.html",
        r#"<p c:title="name">Tom & Jerry: #{name}</p>"#,
        person,
    )
    .unwrap();
    let out = template
        .render(&Value::object([("name", r#"<script>"x"&'y'"#)]))
        .unwrap();
    assert_snapshot!(out, @r#"<p title="&lt;script&gt;&quot;x&quot;&amp;&#39;y&#39;">Tom & Jerry: &lt;script&gt;&quot;x&quot;&amp;&#39;y&#39;</p>"#);
}

#[test]
fn test_document_structure_is_preserved() {
    stencil_testhelpers::setup();

    let out = render(indoc! {r#"
        <!DOCTYPE html>
        <html>
        <head><meta charset="utf-8"><title>#{title}</title></head>
        <body>
        <!-- product list -->
        <br/>
        <p>#{greet(title)}
        </body>
        </html>
    "#});
    assert_snapshot!(out, @r#"
    <!DOCTYPE html>
    <html>
    <head><meta charset="utf-8"><title>Shop</title></head>
    <body>
    <!-- product list -->
    <br/>
    <p>Hello, Shop!
    </body>
    </html>
    "#);
}

#[test]
fn test_raw_text_bodies_are_verbatim() {
    stencil_testhelpers::setup();

    let text = r##"<script>var t = "#{title}"; if (a < b) {}</script><style>p > b {}</style>"##;
    assert_eq!(render(text), text);
}

#[test]
fn test_void_element_end_tags_are_kept() {
    stencil_testhelpers::setup();

    let text = r#"<p>a<br></br>#{title}</p><div><input type="x"></input></div>"#;
    assert_eq!(
        render(text),
        r#"<p>a<br></br>Shop</p><div><input type="x"></input></div>"#
    );
}

#[test]
fn test_unclosed_elements_render_without_end_tags() {
    stencil_testhelpers::setup();

    assert_eq!(render("<div><span>#{title}"), "<div><span>Shop");
}

#[test]
fn test_strip_comments() {
    stencil_testhelpers::setup();

    let config = TemplateConfig::default().with_strip_comments(true);
    let template = compile_with("c.html", "<p><!-- gone -->#{title}</p>", page_type(), &config)
        .unwrap();
    assert_eq!(template.render(&page()).unwrap(), "<p>Shop</p>");
}

#[test]
fn test_escape_disabled() {
    stencil_testhelpers::setup();

    let config = TemplateConfig::default().with_escape(Escape::Disabled);
    let template = compile_with("c.html", "<p>#{html}</p>", page_type(), &config).unwrap();
    assert_eq!(template.render(&page()).unwrap(), "<p><b>hi</b></p>");
}

#[test]
fn test_custom_dynamic_prefix() {
    stencil_testhelpers::setup();

    let config = TemplateConfig::default().with_dynamic_prefix("t-");
    let template = compile_with(
        "c.html",
        r#"<i t-for="n:outer" c:for="literal">#{n}</i>"#,
        page_type(),
        &config,
    )
    .unwrap();
    assert_eq!(
        template.render(&page()).unwrap(),
        r#"<i c:for="literal">1</i><i c:for="literal">2</i>"#
    );
}

#[test]
fn test_method_failure_is_a_render_error() {
    stencil_testhelpers::setup();

    let mut context = page();
    if let Value::Object(fields) = &mut context {
        fields.insert(
            "products".to_string(),
            Value::from(vec![Value::object([
                ("name", Value::from("pen")),
                ("price", Value::from("free")),
                ("inStock", Value::from(true)),
            ])]),
        );
    }
    let err = template(r#"<i c:for="p:products">#{p.priceWithTax(5)}</i>"#)
        .render(&context)
        .unwrap_err();
    assert!(matches!(err, RenderError::Eval { .. }));
    assert_snapshot!(err.to_string(), @"method `priceWithTax()` failed: price is not an int (page.html:1:25)");
}

#[test]
fn test_rendering_twice_gives_the_same_output() {
    stencil_testhelpers::setup();

    let template = template(r#"<p c:for="p:products">#{p.name}</p>"#);
    let first = template.render(&page()).unwrap();
    let second = template.render(&page()).unwrap();
    assert_eq!(first, second);
}
