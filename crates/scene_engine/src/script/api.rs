//! Host functions exposed to scene scripts
//!
//! Scripts see four scope constants (`scene`, `camera`, `controls`,
//! `renderer`), the `three::` primitives namespace, node handles and a few
//! global helpers. Every proxy reads and writes the shared session state; no
//! borrow of it is held while a script callback runs.
//!
//! ```text
//! let cube = update_or_create("cube",
//!     || three::mesh(three::box(1, 1, 1), three::standard(0x44aa88)),
//!     |node| node.set_color(0x44aa88));
//! cube.position = vec3(0, 0.5, 0);
//! tween(cube, "rotation", vec3(0, 3.14, 0), 2000, #{ easing: "sine_in_out", repeat: 3 });
//! ```

use std::rc::Rc;
use std::sync::Arc;

use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, Module, NativeCallContext, Scope, FLOAT, INT};

use crate::animation::{Easing, TweenOptions, TweenProperty, TweenValue};
use crate::assets::{LoadRequest, LoadSource, MeshFormat};
use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::render::{Color, Geometry, Material, RenderBackend};
use crate::scene::{Background, Node, RegistryError};
use crate::viewer::state::{SessionState, SharedState};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

const DEFAULT_SEGMENTS: u32 = 32;

/// Vector value seen by scripts as `Vec3`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptVec3 {
    /// X component
    pub x: FLOAT,
    /// Y component
    pub y: FLOAT,
    /// Z component
    pub z: FLOAT,
}

impl From<Vec3> for ScriptVec3 {
    fn from(v: Vec3) -> Self {
        Self { x: FLOAT::from(v.x), y: FLOAT::from(v.y), z: FLOAT::from(v.z) }
    }
}

impl From<ScriptVec3> for Vec3 {
    fn from(v: ScriptVec3) -> Self {
        Vec3::new(v.x as f32, v.y as f32, v.z as f32)
    }
}

/// Handle to a scene node, seen by scripts as `Node`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    /// Arena id
    pub id: NodeId,
}

/// Shared geometry, seen by scripts as `Geometry`
#[derive(Debug, Clone)]
pub struct GeometryHandle(pub Arc<Geometry>);

/// `scene` scope constant
#[derive(Debug, Clone, Copy)]
pub struct SceneProxy;

/// `camera` scope constant
#[derive(Debug, Clone, Copy)]
pub struct CameraProxy;

/// `controls` scope constant
#[derive(Debug, Clone, Copy)]
pub struct ControlsProxy;

/// `renderer` scope constant
#[derive(Debug, Clone, Copy)]
pub struct RendererProxy;

fn script_error(message: impl AsRef<str>) -> Box<EvalAltResult> {
    message.as_ref().into()
}

fn number(value: &Dynamic) -> ScriptResult<f32> {
    if let Ok(float) = value.as_float() {
        return Ok(float as f32);
    }
    if let Ok(int) = value.as_int() {
        return Ok(int as f32);
    }
    Err(script_error(format!("expected a number, got {}", value.type_name())))
}

fn count(value: &Dynamic, min: u32) -> ScriptResult<u32> {
    let n = number(value)?;
    if !n.is_finite() || n < 0.0 {
        return Err(script_error(format!("expected a positive count, got {n}")));
    }
    Ok((n as u32).max(min))
}

fn color(value: &Dynamic) -> ScriptResult<Color> {
    if let Some(color) = value.clone().try_cast::<Color>() {
        return Ok(color);
    }
    if let Ok(hex) = value.as_int() {
        return u32::try_from(hex)
            .map(Color::from_hex)
            .map_err(|_| script_error(format!("color {hex} is out of range")));
    }
    if let Ok(text) = value.clone().into_string() {
        let digits = text.trim_start_matches('#').trim_start_matches("0x");
        return u32::from_str_radix(digits, 16)
            .map(Color::from_hex)
            .map_err(|_| script_error(format!("invalid color '{text}'")));
    }
    Err(script_error(format!("expected a color, got {}", value.type_name())))
}

fn vector(x: &Dynamic, y: &Dynamic, z: &Dynamic) -> ScriptResult<Vec3> {
    Ok(Vec3::new(number(x)?, number(y)?, number(z)?))
}

fn with_state<R>(state: &SharedState, f: impl FnOnce(&mut SessionState) -> ScriptResult<R>) -> ScriptResult<R> {
    let mut guard = state
        .try_borrow_mut()
        .map_err(|_| script_error("session state is already in use"))?;
    f(&mut guard)
}

fn with_node<R>(state: &SharedState, handle: &NodeHandle, f: impl FnOnce(&mut Node) -> R) -> ScriptResult<R> {
    with_state(state, |s| {
        s.scene
            .get_mut(handle.id)
            .map(f)
            .ok_or_else(|| script_error("node no longer exists"))
    })
}

fn node_or_unit(id: Option<NodeId>) -> Dynamic {
    id.map_or(Dynamic::UNIT, |id| Dynamic::from(NodeHandle { id }))
}

/// Scope holding the session proxies as constants
pub fn session_scope() -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push_constant("scene", SceneProxy);
    scope.push_constant("camera", CameraProxy);
    scope.push_constant("controls", ControlsProxy);
    scope.push_constant("renderer", RendererProxy);
    scope
}

/// Register every host function against `state`
pub fn register(engine: &mut Engine, state: &SharedState) {
    register_types(engine);
    register_logging(engine);
    register_three(engine, state);
    register_nodes(engine, state);
    register_scene(engine, state);
    register_camera(engine, state);
    register_controls(engine, state);
    register_renderer(engine, state);
    register_helpers(engine, state);
}

fn register_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptVec3>("Vec3")
        .register_type_with_name::<NodeHandle>("Node")
        .register_type_with_name::<GeometryHandle>("Geometry")
        .register_type_with_name::<Material>("Material")
        .register_type_with_name::<Color>("Color")
        .register_type_with_name::<SceneProxy>("Scene")
        .register_type_with_name::<CameraProxy>("Camera")
        .register_type_with_name::<ControlsProxy>("Controls")
        .register_type_with_name::<RendererProxy>("Renderer");

    engine
        .register_fn("vec3", |x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<ScriptVec3> {
            Ok(vector(&x, &y, &z)?.into())
        })
        .register_get("x", |v: &mut ScriptVec3| v.x)
        .register_get("y", |v: &mut ScriptVec3| v.y)
        .register_get("z", |v: &mut ScriptVec3| v.z)
        .register_set("x", |v: &mut ScriptVec3, x: Dynamic| -> ScriptResult<()> {
            v.x = FLOAT::from(number(&x)?);
            Ok(())
        })
        .register_set("y", |v: &mut ScriptVec3, y: Dynamic| -> ScriptResult<()> {
            v.y = FLOAT::from(number(&y)?);
            Ok(())
        })
        .register_set("z", |v: &mut ScriptVec3, z: Dynamic| -> ScriptResult<()> {
            v.z = FLOAT::from(number(&z)?);
            Ok(())
        })
        .register_fn("to_string", |v: &mut ScriptVec3| format!("vec3({}, {}, {})", v.x, v.y, v.z))
        .register_fn("to_debug", |v: &mut ScriptVec3| format!("vec3({}, {}, {})", v.x, v.y, v.z))
        .register_fn("==", |a: &mut NodeHandle, b: NodeHandle| a.id == b.id)
        .register_fn("!=", |a: &mut NodeHandle, b: NodeHandle| a.id != b.id)
        .register_fn("to_string", |c: &mut Color| format!("#{:06x}", c.to_hex()));
}

fn register_logging(engine: &mut Engine) {
    engine.on_print(|text| log::info!(target: "script", "{}", text));
    engine.on_debug(|text, source, position| {
        log::debug!(target: "script", "{} {:?} @ {}", text, source, position);
    });
    engine
        .register_fn("log_info", |value: Dynamic| log::info!(target: "script", "{}", value))
        .register_fn("log_warn", |value: Dynamic| log::warn!(target: "script", "{}", value))
        .register_fn("log_error", |value: Dynamic| log::error!(target: "script", "{}", value));
}

fn register_three(engine: &mut Engine, state: &SharedState) {
    let mut three = Module::new();

    three.set_native_fn("box", |w: Dynamic, h: Dynamic, d: Dynamic| -> ScriptResult<GeometryHandle> {
        Ok(GeometryHandle(Arc::new(Geometry::cuboid(number(&w)?, number(&h)?, number(&d)?))))
    });
    three.set_native_fn("sphere", |r: Dynamic| -> ScriptResult<GeometryHandle> {
        Ok(GeometryHandle(Arc::new(Geometry::sphere(number(&r)?, DEFAULT_SEGMENTS, DEFAULT_SEGMENTS / 2))))
    });
    three.set_native_fn(
        "sphere",
        |r: Dynamic, width_segments: Dynamic, height_segments: Dynamic| -> ScriptResult<GeometryHandle> {
            let geometry = Geometry::sphere(number(&r)?, count(&width_segments, 3)?, count(&height_segments, 2)?);
            Ok(GeometryHandle(Arc::new(geometry)))
        },
    );
    three.set_native_fn("plane", |w: Dynamic, h: Dynamic| -> ScriptResult<GeometryHandle> {
        Ok(GeometryHandle(Arc::new(Geometry::plane(number(&w)?, number(&h)?))))
    });
    three.set_native_fn("cylinder", |top: Dynamic, bottom: Dynamic, h: Dynamic| -> ScriptResult<GeometryHandle> {
        let geometry = Geometry::cylinder(number(&top)?, number(&bottom)?, number(&h)?, DEFAULT_SEGMENTS);
        Ok(GeometryHandle(Arc::new(geometry)))
    });
    three.set_native_fn("cone", |r: Dynamic, h: Dynamic| -> ScriptResult<GeometryHandle> {
        Ok(GeometryHandle(Arc::new(Geometry::cone(number(&r)?, number(&h)?, DEFAULT_SEGMENTS))))
    });
    three.set_native_fn("torus", |r: Dynamic, tube: Dynamic| -> ScriptResult<GeometryHandle> {
        let geometry = Geometry::torus(number(&r)?, number(&tube)?, DEFAULT_SEGMENTS / 2, DEFAULT_SEGMENTS * 2);
        Ok(GeometryHandle(Arc::new(geometry)))
    });

    three.set_native_fn("standard", |c: Dynamic| -> ScriptResult<Material> { Ok(Material::standard(color(&c)?)) });
    three.set_native_fn("phong", |c: Dynamic| -> ScriptResult<Material> { Ok(Material::phong(color(&c)?)) });
    three.set_native_fn("basic", |c: Dynamic| -> ScriptResult<Material> { Ok(Material::basic(color(&c)?)) });
    three.set_native_fn("color", |c: Dynamic| color(&c));
    three.set_native_fn("vec3", |x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<ScriptVec3> {
        Ok(vector(&x, &y, &z)?.into())
    });

    let s = Rc::clone(state);
    three.set_native_fn("mesh", move |geometry: GeometryHandle, material: Material| -> ScriptResult<NodeHandle> {
        with_state(&s, |state| {
            let id = state.scene.create(Node::mesh(geometry.0, material));
            Ok(NodeHandle { id })
        })
    });
    let s = Rc::clone(state);
    three.set_native_fn("group", move || -> ScriptResult<NodeHandle> {
        with_state(&s, |state| Ok(NodeHandle { id: state.scene.create(Node::group()) }))
    });

    engine.register_static_module("three", three.into());
}

fn register_nodes(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_get("name", move |h: &mut NodeHandle| -> ScriptResult<Dynamic> {
        with_node(&s, h, |node| node.name.clone().map_or(Dynamic::UNIT, Dynamic::from))
    });
    let s = Rc::clone(state);
    engine.register_set("name", move |h: &mut NodeHandle, name: ImmutableString| -> ScriptResult<()> {
        with_node(&s, h, |node| node.name = Some(name.to_string()))
    });

    let s = Rc::clone(state);
    engine.register_get("position", move |h: &mut NodeHandle| -> ScriptResult<ScriptVec3> {
        with_node(&s, h, |node| node.transform.position.into())
    });
    let s = Rc::clone(state);
    engine.register_set("position", move |h: &mut NodeHandle, v: ScriptVec3| -> ScriptResult<()> {
        with_node(&s, h, |node| node.transform.position = v.into())
    });
    let s = Rc::clone(state);
    engine.register_get("rotation", move |h: &mut NodeHandle| -> ScriptResult<ScriptVec3> {
        with_node(&s, h, |node| node.transform.rotation.into())
    });
    let s = Rc::clone(state);
    engine.register_set("rotation", move |h: &mut NodeHandle, v: ScriptVec3| -> ScriptResult<()> {
        with_node(&s, h, |node| node.transform.rotation = v.into())
    });
    let s = Rc::clone(state);
    engine.register_get("scale", move |h: &mut NodeHandle| -> ScriptResult<ScriptVec3> {
        with_node(&s, h, |node| node.transform.scale.into())
    });
    let s = Rc::clone(state);
    engine.register_set("scale", move |h: &mut NodeHandle, v: ScriptVec3| -> ScriptResult<()> {
        with_node(&s, h, |node| node.transform.scale = v.into())
    });
    let s = Rc::clone(state);
    engine.register_get("visible", move |h: &mut NodeHandle| -> ScriptResult<bool> {
        with_node(&s, h, |node| node.visible)
    });
    let s = Rc::clone(state);
    engine.register_set("visible", move |h: &mut NodeHandle, visible: bool| -> ScriptResult<()> {
        with_node(&s, h, |node| node.visible = visible)
    });

    let s = Rc::clone(state);
    engine.register_fn("add", move |parent: &mut NodeHandle, child: NodeHandle| -> ScriptResult<()> {
        with_state(&s, |state| {
            state
                .scene
                .attach(child.id, Some(parent.id))
                .map_err(|e| script_error(e.to_string()))
        })
    });

    let s = Rc::clone(state);
    engine.register_fn("set_color", move |h: &mut NodeHandle, c: Dynamic| -> ScriptResult<()> {
        let c = color(&c)?;
        with_node(&s, h, |node| {
            if let Some(mesh) = node.as_mesh_mut() {
                mesh.material.set_color(c);
            }
        })
    });
    let s = Rc::clone(state);
    engine.register_fn("set_opacity", move |h: &mut NodeHandle, opacity: Dynamic| -> ScriptResult<()> {
        let opacity = number(&opacity)?;
        with_node(&s, h, |node| {
            if let Some(mesh) = node.as_mesh_mut() {
                mesh.material.set_opacity(opacity);
            }
        })
    });
    let s = Rc::clone(state);
    engine.register_fn("set_metalness", move |h: &mut NodeHandle, value: Dynamic| -> ScriptResult<()> {
        let value = number(&value)?.clamp(0.0, 1.0);
        with_node(&s, h, |node| {
            if let Some(Material::Standard(material)) = node.as_mesh_mut().map(|mesh| &mut mesh.material) {
                material.metalness = value;
                material.needs_update = true;
            }
        })
    });
    let s = Rc::clone(state);
    engine.register_fn("set_roughness", move |h: &mut NodeHandle, value: Dynamic| -> ScriptResult<()> {
        let value = number(&value)?.clamp(0.0, 1.0);
        with_node(&s, h, |node| {
            if let Some(Material::Standard(material)) = node.as_mesh_mut().map(|mesh| &mut mesh.material) {
                material.roughness = value;
                material.needs_update = true;
            }
        })
    });
}

fn register_scene(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_fn("add", move |_: &mut SceneProxy, node: NodeHandle| -> ScriptResult<()> {
        with_state(&s, |state| state.scene.attach(node.id, None).map_err(|e| script_error(e.to_string())))
    });
    let s = Rc::clone(state);
    engine.register_fn("remove", move |_: &mut SceneProxy, node: NodeHandle| -> ScriptResult<()> {
        with_state(&s, |state| {
            state.scene.detach(node.id);
            Ok(())
        })
    });
    let s = Rc::clone(state);
    engine.register_fn("get_object_by_name", move |_: &mut SceneProxy, name: &str| -> ScriptResult<Dynamic> {
        with_state(&s, |state| Ok(node_or_unit(state.scene.get_object_by_name(name))))
    });
    let s = Rc::clone(state);
    engine.register_fn("node_count", move |_: &mut SceneProxy| -> ScriptResult<INT> {
        with_state(&s, |state| Ok(state.scene.node_count() as INT))
    });
    let s = Rc::clone(state);
    engine.register_fn("set_background", move |_: &mut SceneProxy, c: Dynamic| -> ScriptResult<()> {
        let c = color(&c)?;
        with_state(&s, |state| {
            state.scene.background = Some(Background::Color(c));
            Ok(())
        })
    });
}

fn register_camera(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_get("position", move |_: &mut CameraProxy| -> ScriptResult<ScriptVec3> {
        with_state(&s, |state| Ok(state.camera.position.into()))
    });
    let s = Rc::clone(state);
    engine.register_get("fov", move |_: &mut CameraProxy| -> ScriptResult<FLOAT> {
        with_state(&s, |state| Ok(FLOAT::from(state.camera.fov_degrees())))
    });
    let s = Rc::clone(state);
    engine.register_get("aspect", move |_: &mut CameraProxy| -> ScriptResult<FLOAT> {
        with_state(&s, |state| Ok(FLOAT::from(state.camera.aspect)))
    });
    let s = Rc::clone(state);
    engine.register_fn(
        "set_position",
        move |_: &mut CameraProxy, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<()> {
            let position = vector(&x, &y, &z)?;
            with_state(&s, |state| {
                state.camera.set_position(position);
                Ok(())
            })
        },
    );
    // The orbit controls re-aim the camera every frame, so look_at moves their target too.
    let s = Rc::clone(state);
    engine.register_fn(
        "look_at",
        move |_: &mut CameraProxy, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<()> {
            let target = vector(&x, &y, &z)?;
            with_state(&s, |state| {
                state.camera.look_at(target);
                state.controls.set_target(target);
                Ok(())
            })
        },
    );
    let s = Rc::clone(state);
    engine.register_fn("set_fov", move |_: &mut CameraProxy, degrees: Dynamic| -> ScriptResult<()> {
        let degrees = number(&degrees)?;
        with_state(&s, |state| {
            state.camera.set_fov_degrees(degrees);
            Ok(())
        })
    });
}

fn register_controls(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_get("target", move |_: &mut ControlsProxy| -> ScriptResult<ScriptVec3> {
        with_state(&s, |state| Ok(state.controls.target.into()))
    });
    let s = Rc::clone(state);
    engine.register_fn(
        "set_target",
        move |_: &mut ControlsProxy, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<()> {
            let target = vector(&x, &y, &z)?;
            with_state(&s, |state| {
                state.controls.set_target(target);
                Ok(())
            })
        },
    );
    let s = Rc::clone(state);
    engine.register_fn("set_damping", move |_: &mut ControlsProxy, factor: Dynamic| -> ScriptResult<()> {
        let factor = number(&factor)?;
        with_state(&s, |state| {
            state.controls.set_damping(factor);
            Ok(())
        })
    });
    let s = Rc::clone(state);
    engine.register_fn("set_auto_rotate", move |_: &mut ControlsProxy, speed: Dynamic| -> ScriptResult<()> {
        let speed = number(&speed)?;
        with_state(&s, |state| {
            state.controls.auto_rotate_speed = speed;
            Ok(())
        })
    });
}

fn register_renderer(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_get("width", move |_: &mut RendererProxy| -> ScriptResult<INT> {
        with_state(&s, |state| Ok(INT::from(state.renderer.size().0)))
    });
    let s = Rc::clone(state);
    engine.register_get("height", move |_: &mut RendererProxy| -> ScriptResult<INT> {
        with_state(&s, |state| Ok(INT::from(state.renderer.size().1)))
    });
    let s = Rc::clone(state);
    engine.register_fn("set_clear_color", move |_: &mut RendererProxy, c: Dynamic| -> ScriptResult<()> {
        let c = color(&c)?;
        with_state(&s, |state| {
            state.renderer.set_clear_color(c);
            Ok(())
        })
    });
}

fn tween_options(options: &Map) -> ScriptResult<TweenOptions> {
    let mut parsed = TweenOptions::default();
    if let Some(easing) = options.get("easing") {
        let name = easing.clone().into_string().map_err(|_| script_error("easing must be a string"))?;
        parsed.easing = Easing::from_name(&name).map_err(|e| script_error(e.to_string()))?;
    }
    if let Some(delay) = options.get("delay") {
        parsed.delay = number(delay)? / 1000.0;
    }
    if let Some(repeat) = options.get("repeat") {
        parsed.repeat = count(repeat, 0)?;
    }
    if let Some(yoyo) = options.get("yoyo") {
        parsed.yoyo = yoyo.as_bool().map_err(|_| script_error("yoyo must be a boolean"))?;
    }
    Ok(parsed)
}

fn start_tween(
    state: &SharedState,
    node: NodeHandle,
    property: &str,
    target: &Dynamic,
    duration_ms: &Dynamic,
    options: TweenOptions,
) -> ScriptResult<INT> {
    let property = TweenProperty::from_name(property).map_err(|e| script_error(e.to_string()))?;
    let target = match target.clone().try_cast::<ScriptVec3>() {
        Some(v) => TweenValue::Vec3(v.into()),
        None => TweenValue::Scalar(number(target)?),
    };
    let duration = number(duration_ms)? / 1000.0;
    with_state(state, |s| {
        if !s.scene.contains(node.id) {
            return Err(script_error("cannot tween a node that no longer exists"));
        }
        let id = s
            .tweens
            .add(node.id, property, target, duration, options)
            .map_err(|e| script_error(e.to_string()))?;
        Ok(id.0 as INT)
    })
}

fn register_helpers(engine: &mut Engine, state: &SharedState) {
    let s = Rc::clone(state);
    engine.register_fn(
        "update_or_create",
        move |context: NativeCallContext, name: &str, create: FnPtr, update: FnPtr| -> ScriptResult<Dynamic> {
            let existing = with_state(&s, |state| {
                let SessionState { registry, scene, .. } = state;
                Ok(registry.resolve(scene, name))
            })?;

            if let Some(id) = existing {
                let handle = NodeHandle { id };
                update.call_within_context::<Dynamic>(&context, (handle,))?;
                return Ok(Dynamic::from(handle));
            }

            let created = create.call_within_context::<Dynamic>(&context, ())?;
            let Some(handle) = created.try_cast::<NodeHandle>() else {
                log::warn!(target: "script", "create function for '{}' did not return a node; nothing attached", name);
                return Ok(Dynamic::UNIT);
            };
            with_state(&s, |state| {
                let SessionState { registry, scene, .. } = state;
                match registry.adopt(scene, name, handle.id) {
                    Ok(_) => Ok(Dynamic::from(handle)),
                    Err(RegistryError::NodeInUse(_)) => {
                        log::warn!(target: "script", "create function for '{}' returned a node already in the scene; nothing attached", name);
                        Ok(Dynamic::UNIT)
                    }
                    Err(e) => Err(script_error(e.to_string())),
                }
            })
        },
    );

    let s = Rc::clone(state);
    engine.register_fn("load_model", move |name: &str, path: &str, format: &str| -> ScriptResult<INT> {
        let format = MeshFormat::from_extension(format).map_err(|e| script_error(e.to_string()))?;
        with_state(&s, |state| {
            let generation = state.generation;
            let ticket = state.loader.submit(LoadRequest {
                name: name.to_string(),
                format,
                source: LoadSource::Path(path.to_string()),
                generation,
            });
            Ok(ticket.0 as INT)
        })
    });

    let s = Rc::clone(state);
    engine.register_fn(
        "tween",
        move |node: NodeHandle, property: &str, target: Dynamic, duration_ms: Dynamic| -> ScriptResult<INT> {
            start_tween(&s, node, property, &target, &duration_ms, TweenOptions::default())
        },
    );
    let s = Rc::clone(state);
    engine.register_fn(
        "tween",
        move |node: NodeHandle, property: &str, target: Dynamic, duration_ms: Dynamic, options: Map| -> ScriptResult<INT> {
            start_tween(&s, node, property, &target, &duration_ms, tween_options(&options)?)
        },
    );
}
