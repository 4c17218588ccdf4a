//! Schema names used by the converter.

/// Prim type names.
pub mod types {
    pub const XFORM: &str = "Xform";
    pub const SCOPE: &str = "Scope";
    pub const CUBE: &str = "Cube";
    pub const SPHERE: &str = "Sphere";
    pub const CYLINDER: &str = "Cylinder";
    pub const CAPSULE: &str = "Capsule";
    pub const PLANE: &str = "Plane";
    pub const MESH: &str = "Mesh";
    pub const MATERIAL: &str = "Material";
    pub const SHADER: &str = "Shader";
    pub const CAMERA: &str = "Camera";
    pub const LIDAR: &str = "Lidar";
    pub const PHYSICS_SCENE: &str = "PhysicsScene";
    pub const REVOLUTE_JOINT: &str = "PhysicsRevoluteJoint";
    pub const PRISMATIC_JOINT: &str = "PhysicsPrismaticJoint";
    pub const FIXED_JOINT: &str = "PhysicsFixedJoint";
    pub const SPHERICAL_JOINT: &str = "PhysicsSphericalJoint";
    pub const JOINT: &str = "PhysicsJoint";
    pub const DISTANT_LIGHT: &str = "DistantLight";
    pub const SPHERE_LIGHT: &str = "SphereLight";
    pub const DISK_LIGHT: &str = "DiskLight";
    pub const RECT_LIGHT: &str = "RectLight";
}

/// Applied API schema names.
pub mod apis {
    pub const RIGID_BODY: &str = "PhysicsRigidBodyAPI";
    pub const MASS: &str = "PhysicsMassAPI";
    pub const COLLISION: &str = "PhysicsCollisionAPI";
    pub const MATERIAL_BINDING: &str = "MaterialBindingAPI";
    pub const SHAPING: &str = "ShapingAPI";
    pub const DRIVE_ANGULAR: &str = "PhysicsDriveAPI:angular";
    pub const DRIVE_LINEAR: &str = "PhysicsDriveAPI:linear";
}

/// Attribute and relationship names.
pub mod attrs {
    pub const XFORM_OP_ORDER: &str = "xformOpOrder";
    pub const TRANSLATE: &str = "xformOp:translate";
    pub const ORIENT: &str = "xformOp:orient";
    pub const SCALE: &str = "xformOp:scale";
    pub const PURPOSE: &str = "purpose";
    pub const DISPLAY_COLOR: &str = "primvars:displayColor";

    pub const SIZE: &str = "size";
    pub const RADIUS: &str = "radius";
    pub const HEIGHT: &str = "height";
    pub const AXIS: &str = "axis";
    pub const WIDTH: &str = "width";
    pub const LENGTH: &str = "length";

    pub const GRAVITY_DIRECTION: &str = "physics:gravityDirection";
    pub const GRAVITY_MAGNITUDE: &str = "physics:gravityMagnitude";
    pub const MASS: &str = "physics:mass";
    pub const DIAGONAL_INERTIA: &str = "physics:diagonalInertia";
    pub const PRINCIPAL_AXES: &str = "physics:principalAxes";
    pub const CENTER_OF_MASS: &str = "physics:centerOfMass";
    pub const KINEMATIC_ENABLED: &str = "physics:kinematicEnabled";

    pub const BODY0: &str = "physics:body0";
    pub const BODY1: &str = "physics:body1";
    pub const LOCAL_POS0: &str = "physics:localPos0";
    pub const LOCAL_POS1: &str = "physics:localPos1";
    pub const LOCAL_ROT0: &str = "physics:localRot0";
    pub const LOCAL_ROT1: &str = "physics:localRot1";
    pub const JOINT_AXIS: &str = "physics:axis";
    pub const LOWER_LIMIT: &str = "physics:lowerLimit";
    pub const UPPER_LIMIT: &str = "physics:upperLimit";
    pub const ANGULAR_MAX_FORCE: &str = "drive:angular:physics:maxForce";
    pub const ANGULAR_DAMPING: &str = "drive:angular:physics:damping";
    pub const ANGULAR_STIFFNESS: &str = "drive:angular:physics:stiffness";
    pub const LINEAR_MAX_FORCE: &str = "drive:linear:physics:maxForce";
    pub const LINEAR_DAMPING: &str = "drive:linear:physics:damping";
    pub const LINEAR_STIFFNESS: &str = "drive:linear:physics:stiffness";

    pub const MATERIAL_BINDING: &str = "material:binding";
    pub const SURFACE_OUTPUT: &str = "outputs:surface";
    pub const INFO_ID: &str = "info:id";

    pub const FOCAL_LENGTH: &str = "focalLength";
    pub const HORIZONTAL_APERTURE: &str = "horizontalAperture";
    pub const VERTICAL_APERTURE: &str = "verticalAperture";
    pub const CLIPPING_RANGE: &str = "clippingRange";

    pub const LIGHT_INTENSITY: &str = "inputs:intensity";
    pub const LIGHT_COLOR: &str = "inputs:color";
    pub const LIGHT_RADIUS: &str = "inputs:radius";
    pub const LIGHT_SHADOW_ENABLE: &str = "inputs:shadow:enable";
    pub const SHAPING_CONE_ANGLE: &str = "inputs:shaping:cone:angle";
    pub const SHAPING_CONE_SOFTNESS: &str = "inputs:shaping:cone:softness";
}

/// Shader identifiers and input names of the preview surface network.
pub mod shading {
    pub const PREVIEW_SURFACE: &str = "UsdPreviewSurface";
    pub const UV_TEXTURE: &str = "UsdUVTexture";

    pub const DIFFUSE_COLOR: &str = "inputs:diffuseColor";
    pub const EMISSIVE_COLOR: &str = "inputs:emissiveColor";
    pub const SPECULAR_COLOR: &str = "inputs:specularColor";
    pub const METALLIC: &str = "inputs:metallic";
    pub const ROUGHNESS: &str = "inputs:roughness";
    pub const NORMAL: &str = "inputs:normal";
    pub const OPACITY: &str = "inputs:opacity";
    pub const USE_SPECULAR_WORKFLOW: &str = "inputs:useSpecularWorkflow";
    pub const FILE: &str = "inputs:file";
    pub const OUTPUT_RGB: &str = "outputs:rgb";
    pub const OUTPUT_R: &str = "outputs:r";

    /// OmniPBR MDL parameter names.
    pub mod omni {
        pub const DIFFUSE_COLOR: &str = "inputs:diffuse_color_constant";
        pub const DIFFUSE_TEXTURE: &str = "inputs:diffuse_texture";
        pub const METALLIC: &str = "inputs:metallic_constant";
        pub const METALLIC_TEXTURE: &str = "inputs:metallic_texture";
        pub const ROUGHNESS: &str = "inputs:reflection_roughness_constant";
        pub const ROUGHNESS_TEXTURE: &str = "inputs:reflectionroughness_texture";
        pub const NORMAL_TEXTURE: &str = "inputs:normalmap_texture";
        pub const EMISSIVE_COLOR: &str = "inputs:emissive_color";
        pub const EMISSIVE_TEXTURE: &str = "inputs:emissive_color_texture";
        pub const ENABLE_EMISSION: &str = "inputs:enable_emission";
    }
}

/// Custom attributes carrying physics-description data USD has no schema for.
pub mod custom {
    pub const URI: &str = "sdf:uri";
    pub const SUBMESH: &str = "sdf:submesh";
    pub const SENSOR_TYPE: &str = "sdf:sensorType";
    pub const UPDATE_RATE: &str = "sdf:updateRate";
    pub const IMAGE_WIDTH: &str = "sdf:imageWidth";
    pub const IMAGE_HEIGHT: &str = "sdf:imageHeight";
    pub const LIDAR_HORIZONTAL_FOV: &str = "horizontalFov";
    pub const LIDAR_VERTICAL_FOV: &str = "verticalFov";
    pub const LIDAR_HORIZONTAL_RESOLUTION: &str = "horizontalResolution";
    pub const LIDAR_VERTICAL_RESOLUTION: &str = "verticalResolution";
    pub const LIDAR_MIN_RANGE: &str = "minRange";
    pub const LIDAR_MAX_RANGE: &str = "maxRange";
}
