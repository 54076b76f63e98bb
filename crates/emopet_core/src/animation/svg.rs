//! SVG snapshot of a frame
//!
//! The document uses a 300×300 view box with the three glow filters defined
//! once; the frame's active filter carries its current blur strength so a
//! static snapshot shows the pulse at that instant.

use std::fmt::Write;

use super::config::GlowFilter;
use super::engine::Frame;
use super::geometry::EyeGeometry;

/// Side length of the square view box
pub const VIEW_BOX: f32 = 300.0;

impl Frame {
    /// Render the frame as a standalone SVG document
    pub fn to_svg(&self) -> String {
        let mut svg = String::with_capacity(2048);
        // Writing into a String cannot fail
        let _ = self.write_svg(&mut svg);
        svg
    }

    fn write_svg(&self, out: &mut String) -> std::fmt::Result {
        let center = VIEW_BOX / 2.0;
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {VIEW_BOX} {VIEW_BOX}">"#
        )?;

        out.push_str("<defs>\n");
        for filter in GlowFilter::ALL {
            let std_dev = if self.glow == Some(filter) {
                self.glow_strength
            } else {
                filter.blur_std_deviation()
            };
            write_filter(out, filter, std_dev)?;
        }
        out.push_str("</defs>\n");

        let mut class = String::from("emopet");
        if self.tap_pulse {
            class.push_str(" tap");
        }
        if self.glow_phase > 0 {
            let _ = write!(class, " angry-{}", self.glow_phase);
        }
        writeln!(
            out,
            r#"<g class="{class}" transform="rotate({:.3} {center} {center})">"#,
            self.head_tilt
        )?;
        self.write_eye(out, &self.left)?;
        self.write_eye(out, &self.right)?;
        out.push_str("</g>\n</svg>\n");
        Ok(())
    }

    fn write_eye(&self, out: &mut String, eye: &EyeGeometry) -> std::fmt::Result {
        match self.glow {
            Some(filter) => writeln!(out, r#"<g filter="url(#{})">"#, filter.id())?,
            None => out.push_str("<g>\n"),
        }

        let rect = eye.rect;
        let (_, cy) = rect.center();
        writeln!(
            out,
            r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="{}" transform="translate(0 {cy:.3}) scale(1 {}) translate(0 {:.3})"/>"#,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.fill,
            eye.scale_y,
            -cy
        )?;

        let h = eye.highlight;
        writeln!(
            out,
            r#"<ellipse cx="{:.3}" cy="{:.3}" rx="{:.3}" ry="{:.3}" fill="white" opacity="{}"/>"#,
            h.cx, h.cy, h.rx, h.ry, h.opacity
        )?;
        out.push_str("</g>\n");
        Ok(())
    }
}

fn write_filter(out: &mut String, filter: GlowFilter, std_dev: f32) -> std::fmt::Result {
    let k = filter.halo_intensity();
    writeln!(
        out,
        r#"<filter id="{}" x="-50%" y="-50%" width="200%" height="200%">"#,
        filter.id()
    )?;
    writeln!(
        out,
        r#"<feGaussianBlur in="SourceGraphic" stdDeviation="{std_dev:.3}" result="blur"/>"#
    )?;
    writeln!(
        out,
        r#"<feColorMatrix in="blur" type="matrix" values="0 0 0 0 {k} 0 0 0 0 {k} 0 0 0 0 {k} 0 0 0 1 0" result="colorBlur"/>"#
    )?;
    out.push_str(
        "<feMerge><feMergeNode in=\"colorBlur\"/><feMergeNode in=\"SourceGraphic\"/></feMerge>\n",
    );
    out.push_str("</filter>\n");
    Ok(())
}
