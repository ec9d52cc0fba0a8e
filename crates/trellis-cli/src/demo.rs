//! Built-in demo graph.

use trellis::{
    GraphError,
    attribute::AttrValue,
    attrs,
    context::{ContextStack, ElementKind},
    model::{Compass, Endpoint, Graph},
};

/// Builds a small build-pipeline graph exercising scoped defaults, a
/// cluster, record ports and an HTML label.
pub fn demo_graph() -> Result<Graph, GraphError> {
    let ctx = ContextStack::new();
    ctx.scope(|ctx| -> Result<Graph, GraphError> {
        ctx.add_pending(ElementKind::Graph, "rankdir", "LR")?;
        ctx.add_pending(ElementKind::Node, "shape", "box")?;
        ctx.add_pending_attrs(ElementKind::Edge, &attrs!["style" => "solid", "color" => "blue"])?;

        let mut graph = ctx.graph("pipeline").directed(true);
        graph.link(ctx, "source", "parse");

        let stages = graph.cluster_subgraph(ctx, "build");
        if let Some(build) = graph.subgraph_mut(stages) {
            build.set_attr("label", "build");
            ctx.scope(|ctx| -> Result<(), GraphError> {
                ctx.add_pending(ElementKind::Edge, "style", "dashed")?;
                build.link(ctx, "compile", "link");
                Ok(())
            })?;
        }

        graph
            .node(ctx, "report")
            .set("shape", "record")
            .set("label", "<ok> passed|<ko> failed");
        graph.link(ctx, "parse", "compile").set("color", "red");
        graph.link(ctx, "link", Endpoint::new("report").with_record("ok"));
        graph
            .node(ctx, "done")
            .set("label", AttrValue::html("<b>done</b>"));
        graph.link(
            ctx,
            Endpoint::new("report").with_record("ko"),
            Endpoint::new("source").with_compass(Compass::South),
        );
        graph.link(ctx, "report", "done");

        Ok(graph)
    })
}
